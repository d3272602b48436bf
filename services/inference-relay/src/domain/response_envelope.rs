/// レスポンスエンベロープ
///
/// Step Functionsへ返却する`{"statusCode": 200, "body": <event>}`形式の結果。
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 成功時のステータスコード
pub const STATUS_OK: u16 = 200;

/// Lambdaの返却値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// ステータスコード
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// 推論結果を追加したイベント
    pub body: Value,
}

impl ResponseEnvelope {
    /// 成功レスポンスを作成
    pub fn ok(body: Value) -> Self {
        Self {
            status_code: STATUS_OK,
            body,
        }
    }
}
