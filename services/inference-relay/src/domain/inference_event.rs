/// 推論イベント
///
/// Step Functionsから渡されるイベントを表す。
/// `image_data`キーにBase64画像を持ち、処理後に`inferences`キーへ推論結果が追加される。
/// それ以外のキーは変更せずにそのまま返却する。
use serde_json::{Map, Value};
use thiserror::Error;

/// 入力画像のキー名
pub const IMAGE_DATA_KEY: &str = "image_data";

/// 推論結果を格納するキー名
pub const INFERENCES_KEY: &str = "inferences";

/// イベント解釈のエラー型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// イベントがJSONオブジェクトではない
    #[error("イベントはJSONオブジェクトである必要があります")]
    NotAnObject,
    /// image_dataキーが存在しない
    #[error("image_dataがイベントに含まれていません")]
    MissingImageData,
    /// image_dataが文字列ではない
    #[error("image_dataは文字列である必要があります")]
    ImageDataNotString,
}

/// 推論イベント
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceEvent {
    fields: Map<String, Value>,
}

impl InferenceEvent {
    /// JSON値からイベントを作成
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(EventError::NotAnObject),
        }
    }

    /// Base64画像文字列を取得
    pub fn image_data(&self) -> Result<&str, EventError> {
        match self.fields.get(IMAGE_DATA_KEY) {
            Some(Value::String(data)) => Ok(data),
            Some(_) => Err(EventError::ImageDataNotString),
            None => Err(EventError::MissingImageData),
        }
    }

    /// 推論結果を追加する（既存の値は上書き）
    pub fn attach_inferences(&mut self, inferences: Value) {
        self.fields.insert(INFERENCES_KEY.to_string(), inferences);
    }

    /// 推論結果を取得
    pub fn inferences(&self) -> Option<&Value> {
        self.fields.get(INFERENCES_KEY)
    }

    /// JSON値に変換
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}
