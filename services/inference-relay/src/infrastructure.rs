// Infrastructure layer modules
pub mod endpoint_config;
pub mod logging;
pub mod sagemaker_client;

// Re-exports
pub use endpoint_config::{EndpointConfig, EndpointConfigError};
pub use logging::init_logging;
#[cfg(test)]
pub use logging::init_test_logging;
pub use sagemaker_client::{InferenceClient, InferenceClientError, SageMakerInferenceClient};
