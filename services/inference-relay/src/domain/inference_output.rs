/// 推論結果の解釈
///
/// エンドポイントのレスポンスボディをイベントへ格納するJSON値に変換する。
/// 内容の検証は行わず、モデルが返したものをそのまま渡す。
use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// レスポンス解釈のエラー型
#[derive(Debug, Error)]
pub enum ResponseParseError {
    /// UTF-8として不正
    #[error("推論レスポンスがUTF-8ではありません: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// JSONとして不正
    #[error("推論レスポンスがJSONではありません: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// レスポンスボディの形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InferenceOutputFormat {
    /// UTF-8 JSONとしてパースして格納する
    #[default]
    Json,
    /// UTF-8文字列のまま格納する
    Text,
}

impl InferenceOutputFormat {
    /// レスポンスボディを解釈する
    pub fn parse(self, body: Vec<u8>) -> Result<Value, ResponseParseError> {
        let text = String::from_utf8(body)?;
        match self {
            Self::Json => Ok(serde_json::from_str(&text)?),
            Self::Text => Ok(Value::String(text)),
        }
    }

    /// 設定値としての名前
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for InferenceOutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 不明な形式名
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("不明な推論レスポンス形式: {0}（json または text）")]
pub struct UnknownOutputFormat(pub String);

impl FromStr for InferenceOutputFormat {
    type Err = UnknownOutputFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(UnknownOutputFormat(other.to_string())),
        }
    }
}
