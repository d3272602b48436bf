// Domain layer modules
pub mod image_payload;
pub mod inference_event;
pub mod inference_output;
pub mod response_envelope;

// Re-exports
pub use image_payload::{DecodeError, ImagePayload};
pub use inference_event::{EventError, IMAGE_DATA_KEY, INFERENCES_KEY, InferenceEvent};
pub use inference_output::{InferenceOutputFormat, ResponseParseError, UnknownOutputFormat};
pub use response_envelope::{ResponseEnvelope, STATUS_OK};
