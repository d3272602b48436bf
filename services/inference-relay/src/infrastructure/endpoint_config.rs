/// 推論エンドポイント設定
///
/// 呼び出し先のSageMakerエンドポイント名、リージョン、送信するContent-Type、
/// レスポンスの解釈形式を環境変数から読み込む。
/// 未設定の場合は本番デプロイ済みエンドポイントの値を使用する。
use thiserror::Error;

use crate::domain::{InferenceOutputFormat, UnknownOutputFormat};

/// エンドポイント名の環境変数
pub const ENDPOINT_NAME_ENV: &str = "SAGEMAKER_ENDPOINT_NAME";
/// リージョンの環境変数
pub const REGION_ENV: &str = "SAGEMAKER_REGION";
/// Content-Typeの環境変数
pub const CONTENT_TYPE_ENV: &str = "INFERENCE_CONTENT_TYPE";
/// レスポンス形式の環境変数
pub const OUTPUT_FORMAT_ENV: &str = "INFERENCE_OUTPUT_FORMAT";

/// デフォルトのエンドポイント名
pub const DEFAULT_ENDPOINT_NAME: &str = "image-classification-2022-10-18-21-51-06-524";
/// デフォルトのリージョン
pub const DEFAULT_REGION: &str = "us-east-1";
/// デフォルトのContent-Type
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// エンドポイント設定のエラー型
#[derive(Debug, Error)]
pub enum EndpointConfigError {
    #[error("環境変数の値が不正です: {name}={value} ({reason})")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// 推論エンドポイント設定
///
/// 以下の環境変数から読み込む（空文字列は未設定として扱う）:
/// - SAGEMAKER_ENDPOINT_NAME: 呼び出すエンドポイント名
/// - SAGEMAKER_REGION: エンドポイントのリージョン
/// - INFERENCE_CONTENT_TYPE: 画像送信時のContent-Type
/// - INFERENCE_OUTPUT_FORMAT: レスポンス形式（json / text）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    endpoint_name: String,
    region: String,
    content_type: String,
    output_format: InferenceOutputFormat,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            endpoint_name: DEFAULT_ENDPOINT_NAME.to_string(),
            region: DEFAULT_REGION.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            output_format: InferenceOutputFormat::default(),
        }
    }
}

impl EndpointConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # エラー
    /// INFERENCE_OUTPUT_FORMATが不明な値の場合はエラーを返す
    pub fn from_env() -> Result<Self, EndpointConfigError> {
        let defaults = Self::default();

        let output_format = match read_env(OUTPUT_FORMAT_ENV) {
            Some(value) => value.parse::<InferenceOutputFormat>().map_err(|err: UnknownOutputFormat| {
                EndpointConfigError::InvalidValue {
                    name: OUTPUT_FORMAT_ENV.to_string(),
                    value: value.clone(),
                    reason: err.to_string(),
                }
            })?,
            None => defaults.output_format,
        };

        Ok(Self {
            endpoint_name: read_env(ENDPOINT_NAME_ENV).unwrap_or(defaults.endpoint_name),
            region: read_env(REGION_ENV).unwrap_or(defaults.region),
            content_type: read_env(CONTENT_TYPE_ENV).unwrap_or(defaults.content_type),
            output_format,
        })
    }

    /// 明示的な値で設定を作成（テスト/ローカル実行用）
    pub fn new(
        endpoint_name: impl Into<String>,
        region: impl Into<String>,
        content_type: impl Into<String>,
        output_format: InferenceOutputFormat,
    ) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            region: region.into(),
            content_type: content_type.into(),
            output_format,
        }
    }

    /// エンドポイント名を上書きする
    pub fn with_endpoint_name(mut self, endpoint_name: impl Into<String>) -> Self {
        self.endpoint_name = endpoint_name.into();
        self
    }

    /// リージョンを上書きする
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Content-Typeを上書きする
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// レスポンス形式を上書きする
    pub fn with_output_format(mut self, output_format: InferenceOutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    /// エンドポイント名を取得
    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    /// リージョンを取得
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Content-Typeを取得
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// レスポンス形式を取得
    pub fn output_format(&self) -> InferenceOutputFormat {
        self.output_format
    }
}

/// 環境変数を読み込む（未設定・空白のみはNone）
fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
