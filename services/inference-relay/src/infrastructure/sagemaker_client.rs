//! SageMaker推論クライアントモジュール
//!
//! デプロイ済みの画像分類エンドポイントを呼び出す操作を提供する。
//! - 画像バイト列をContent-Type付きで送信
//! - レスポンスボディのバイト列を返却

use async_trait::async_trait;
use aws_sdk_sagemakerruntime::error::DisplayErrorContext;
use aws_sdk_sagemakerruntime::primitives::Blob;
use aws_sdk_sagemakerruntime::Client as SageMakerRuntimeClient;
use thiserror::Error;
use tracing::{info, warn};

use crate::infrastructure::EndpointConfig;

/// 推論クライアントのエラー型
#[derive(Debug, Error)]
pub enum InferenceClientError {
    /// AWS SDK エラー
    #[error("AWS SageMaker Runtime APIエラー: {0}")]
    AwsSdkError(String),
    /// レスポンスにボディが含まれない
    #[error("推論レスポンスにボディがありません: {0}")]
    MissingBody(String),
}

/// 推論クライアントトレイト（テスト用の抽象化）
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// エンドポイントにリクエストボディを送信し、レスポンスボディを返す
    ///
    /// # 引数
    /// * `body` - 送信するバイト列（デコード済み画像）
    /// * `content_type` - リクエストのContent-Type
    ///
    /// # 戻り値
    /// * `Ok(Vec<u8>)` - レスポンスボディ
    /// * `Err(InferenceClientError)` - エラー
    async fn invoke(
        &self,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<Vec<u8>, InferenceClientError>;
}

/// 実際のAWS SageMaker Runtime SDKを使用した推論クライアント
#[derive(Debug, Clone)]
pub struct SageMakerInferenceClient {
    client: SageMakerRuntimeClient,
    endpoint_name: String,
}

impl SageMakerInferenceClient {
    /// 新しいSageMakerInferenceClientを作成
    pub fn new(client: SageMakerRuntimeClient, endpoint_name: impl Into<String>) -> Self {
        Self {
            client,
            endpoint_name: endpoint_name.into(),
        }
    }

    /// AWS設定から設定リージョンのクライアントを作成
    ///
    /// 認証情報はデフォルトのクレデンシャルチェーン（Lambda実行ロール等）から取得する。
    pub async fn from_config(config: &EndpointConfig) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region().to_string()))
            .load()
            .await;
        let client = SageMakerRuntimeClient::new(&aws_config);
        Self::new(client, config.endpoint_name())
    }
}

#[async_trait]
impl InferenceClient for SageMakerInferenceClient {
    async fn invoke(
        &self,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<Vec<u8>, InferenceClientError> {
        info!(
            endpoint_name = %self.endpoint_name,
            content_type = %content_type,
            body_bytes = body.len(),
            "InvokeEndpoint呼び出し"
        );

        let response = self
            .client
            .invoke_endpoint()
            .endpoint_name(&self.endpoint_name)
            .content_type(content_type)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|err| {
                let message = DisplayErrorContext(&err).to_string();
                warn!(
                    endpoint_name = %self.endpoint_name,
                    error = %message,
                    "InvokeEndpointエラー"
                );
                InferenceClientError::AwsSdkError(message)
            })?;

        match response.body() {
            Some(body) => Ok(body.as_ref().to_vec()),
            None => {
                warn!(endpoint_name = %self.endpoint_name, "InvokeEndpointレスポンスにボディがありません");
                Err(InferenceClientError::MissingBody(self.endpoint_name.clone()))
            }
        }
    }
}
