/// 推論リレー
///
/// イベントのBase64画像をデコードして推論エンドポイントへ送信し、
/// 結果を`inferences`としてイベントに追加して返却する。
///
/// # 処理フロー
/// 1. イベントから`image_data`を取得
/// 2. Base64デコード
/// 3. 設定されたContent-Typeでエンドポイントを呼び出し
/// 4. レスポンスボディを解釈
/// 5. `inferences`に格納し`{statusCode: 200, body: event}`で包む
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{
    DecodeError, EventError, ImagePayload, InferenceEvent, ResponseEnvelope, ResponseParseError,
};
use crate::infrastructure::{EndpointConfig, InferenceClient, InferenceClientError};

/// 推論リレーのエラー型
#[derive(Debug, Error)]
pub enum InferenceRelayError {
    /// イベントの形式が不正
    #[error(transparent)]
    InvalidEvent(#[from] EventError),
    /// Base64デコード失敗
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// エンドポイント呼び出し失敗
    #[error(transparent)]
    EndpointInvocation(#[from] InferenceClientError),
    /// レスポンス解釈失敗
    #[error(transparent)]
    ResponseParse(#[from] ResponseParseError),
}

impl InferenceRelayError {
    /// ログ出力用のエラー種別名
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEvent(_) => "InvalidEventError",
            Self::Decode(_) => "DecodeError",
            Self::EndpointInvocation(_) => "EndpointInvocationError",
            Self::ResponseParse(_) => "ResponseParseError",
        }
    }
}

/// 推論リレー
pub struct InferenceRelay<C>
where
    C: InferenceClient,
{
    /// 推論クライアント
    client: C,
    /// Content-Typeとレスポンス形式（呼び出し先エンドポイントはクライアント側で保持）
    config: EndpointConfig,
}

impl<C> InferenceRelay<C>
where
    C: InferenceClient,
{
    /// 新しいInferenceRelayを作成
    pub fn new(client: C, config: EndpointConfig) -> Self {
        Self { client, config }
    }

    /// イベントを処理してレスポンスエンベロープを返す
    ///
    /// # 引数
    /// * `payload` - Step Functionsから渡されたイベントJSON
    ///
    /// # 戻り値
    /// * `Ok(ResponseEnvelope)` - statusCode 200と推論結果付きイベント
    /// * `Err(InferenceRelayError)` - いずれかの段階で失敗した場合
    pub async fn handle(&self, payload: Value) -> Result<ResponseEnvelope, InferenceRelayError> {
        let mut event = InferenceEvent::from_value(payload)?;
        let image = ImagePayload::decode(event.image_data()?)?;

        info!(
            content_type = self.config.content_type(),
            image_bytes = image.len(),
            "推論リクエスト送信"
        );

        let response_body = self
            .client
            .invoke(image.into_bytes(), self.config.content_type())
            .await?;

        debug!(
            response_bytes = response_body.len(),
            output_format = %self.config.output_format(),
            "推論レスポンス受信"
        );

        let inferences = self.config.output_format().parse(response_body)?;
        event.attach_inferences(inferences);

        Ok(ResponseEnvelope::ok(event.into_value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InferenceOutputFormat;
    use crate::infrastructure::init_test_logging;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// PNGシグネチャのBase64表現
    const PNG_BASE64: &str = "iVBORw0KGgo=";

    /// テスト用のモック推論クライアント
    ///
    /// 固定のレスポンスを返し、受け取ったリクエストを記録する。
    #[derive(Clone)]
    struct MockInferenceClient {
        response: Result<Vec<u8>, String>,
        call_count: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<(Vec<u8>, String)>>>,
    }

    impl MockInferenceClient {
        fn returning(body: &[u8]) -> Self {
            Self {
                response: Ok(body.to_vec()),
                call_count: Arc::new(AtomicUsize::new(0)),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                response: Err(message.to_string()),
                call_count: Arc::new(AtomicUsize::new(0)),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn requests(&self) -> Vec<(Vec<u8>, String)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceClient for MockInferenceClient {
        async fn invoke(
            &self,
            body: Vec<u8>,
            content_type: &str,
        ) -> Result<Vec<u8>, InferenceClientError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .unwrap()
                .push((body, content_type.to_string()));

            self.response
                .clone()
                .map_err(InferenceClientError::AwsSdkError)
        }
    }

    fn relay_with(client: MockInferenceClient) -> InferenceRelay<MockInferenceClient> {
        InferenceRelay::new(client, EndpointConfig::default())
    }

    // ==================== 正常系 ====================

    #[tokio::test]
    async fn test_handle_attaches_inferences() {
        init_test_logging();
        let relay = relay_with(MockInferenceClient::returning(
            br#"{"class": "cat", "score": 0.9}"#,
        ));

        let envelope = relay.handle(json!({"image_data": PNG_BASE64})).await.unwrap();

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "statusCode": 200,
                "body": {
                    "image_data": PNG_BASE64,
                    "inferences": {"class": "cat", "score": 0.9}
                }
            })
        );
    }

    #[tokio::test]
    async fn test_handle_preserves_other_fields() {
        let relay = relay_with(MockInferenceClient::returning(b"[0.77, 0.23]"));
        let input = json!({
            "image_data": PNG_BASE64,
            "s3_bucket": "sagemaker-us-east-1-123456789012",
            "s3_key": "test/bicycle_s_000513.png",
            "metadata": {"retries": 0, "tags": ["a", "b"]}
        });

        let envelope = relay.handle(input.clone()).await.unwrap();

        let body = envelope.body.as_object().unwrap();
        for (key, value) in input.as_object().unwrap() {
            assert_eq!(body.get(key), Some(value), "{} が変更されている", key);
        }
        assert_eq!(body.get("inferences"), Some(&json!([0.77, 0.23])));
        assert_eq!(body.len(), 5);
    }

    #[tokio::test]
    async fn test_handle_sends_decoded_bytes() {
        let client = MockInferenceClient::returning(b"[1.0]");
        let relay = relay_with(client.clone());

        relay.handle(json!({"image_data": PNG_BASE64})).await.unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].0,
            vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        );
    }

    #[tokio::test]
    async fn test_handle_content_type_independent_of_event() {
        let client = MockInferenceClient::returning(b"[1.0]");
        let relay = relay_with(client.clone());

        let events = vec![
            json!({"image_data": PNG_BASE64}),
            json!({"image_data": PNG_BASE64, "content_type": "image/jpeg"}),
            json!({"image_data": PNG_BASE64, "ContentType": "application/json", "extra": [1, 2]}),
        ];
        for event in events {
            relay.handle(event).await.unwrap();
        }

        let requests = client.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|(_, content_type)| content_type == "image/png"));
    }

    #[tokio::test]
    async fn test_handle_is_idempotent() {
        let relay = relay_with(MockInferenceClient::returning(
            br#"{"class": "cat", "score": 0.9}"#,
        ));
        let input = json!({"image_data": PNG_BASE64, "step": "classify"});

        let first = relay.handle(input.clone()).await.unwrap();
        let second = relay.handle(input).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_handle_text_output_format() {
        let client = MockInferenceClient::returning(b"[0.77, 0.23]");
        let config = EndpointConfig::default().with_output_format(InferenceOutputFormat::Text);
        let relay = InferenceRelay::new(client, config);

        let envelope = relay.handle(json!({"image_data": PNG_BASE64})).await.unwrap();

        assert_eq!(envelope.body["inferences"], json!("[0.77, 0.23]"));
    }

    #[tokio::test]
    async fn test_handle_uses_configured_content_type() {
        let client = MockInferenceClient::returning(b"[1.0]");
        let config = EndpointConfig::default().with_content_type("application/x-image");
        let relay = InferenceRelay::new(client.clone(), config);

        relay.handle(json!({"image_data": PNG_BASE64})).await.unwrap();

        assert_eq!(client.requests()[0].1, "application/x-image");
    }

    // ==================== 異常系 ====================

    #[tokio::test]
    async fn test_handle_malformed_base64_fails_without_invoking() {
        let client = MockInferenceClient::returning(b"[1.0]");
        let relay = relay_with(client.clone());

        let result = relay.handle(json!({"image_data": "%%% not base64 %%%"})).await;

        let err = result.unwrap_err();
        assert!(matches!(err, InferenceRelayError::Decode(_)));
        assert_eq!(err.kind(), "DecodeError");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_missing_image_data() {
        let relay = relay_with(MockInferenceClient::returning(b"[1.0]"));

        let err = relay.handle(json!({"s3_key": "x.png"})).await.unwrap_err();

        assert!(matches!(
            err,
            InferenceRelayError::InvalidEvent(EventError::MissingImageData)
        ));
        assert_eq!(err.kind(), "InvalidEventError");
    }

    #[tokio::test]
    async fn test_handle_non_object_event() {
        let relay = relay_with(MockInferenceClient::returning(b"[1.0]"));

        let err = relay.handle(json!(PNG_BASE64)).await.unwrap_err();

        assert!(matches!(
            err,
            InferenceRelayError::InvalidEvent(EventError::NotAnObject)
        ));
    }

    #[tokio::test]
    async fn test_handle_endpoint_failure() {
        let client = MockInferenceClient::failing("Endpoint image-classification not found");
        let relay = relay_with(client.clone());

        let err = relay
            .handle(json!({"image_data": PNG_BASE64}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "EndpointInvocationError");
        assert!(err.to_string().contains("Endpoint image-classification not found"));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_handle_non_json_response() {
        let relay = relay_with(MockInferenceClient::returning(b"<html>502</html>"));

        let err = relay
            .handle(json!({"image_data": PNG_BASE64}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InferenceRelayError::ResponseParse(ResponseParseError::InvalidJson(_))
        ));
        assert_eq!(err.kind(), "ResponseParseError");
    }

    #[tokio::test]
    async fn test_handle_non_utf8_response() {
        let relay = relay_with(MockInferenceClient::returning(&[0xc3, 0x28]));

        let err = relay
            .handle(json!({"image_data": PNG_BASE64}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InferenceRelayError::ResponseParse(ResponseParseError::InvalidUtf8(_))
        ));
    }
}
