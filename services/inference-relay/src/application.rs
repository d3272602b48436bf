// アプリケーション層モジュール
pub mod inference_relay;

// 再エクスポート
pub use inference_relay::{InferenceRelay, InferenceRelayError};
