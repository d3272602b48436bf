/// 画像ペイロード
///
/// イベントの`image_data`に格納されたBase64文字列と、
/// 推論エンドポイントへ送信する生バイト列との相互変換を行う。
use base64::alphabet;
use base64::engine::{general_purpose, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

/// デコード用エンジン
///
/// 標準アルファベット・パディング必須。末尾シンボルの余剰ビットは無視する。
const DECODE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Base64デコードのエラー型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("image_dataのBase64デコードに失敗しました: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);

/// デコード済みの画像バイト列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
}

impl ImagePayload {
    /// Base64文字列をデコードする
    ///
    /// 標準アルファベット（パディングあり）を受け付ける。
    /// エンコーダーが挿入する改行などのASCII空白と、末尾シンボルの余剰ビットは無視する。
    pub fn decode(encoded: &str) -> Result<Self, DecodeError> {
        let compact: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        let bytes = DECODE_ENGINE.decode(compact)?;
        Ok(Self { bytes })
    }

    /// 生バイト列から作成
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Base64文字列にエンコードする
    pub fn encode(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    /// バイト列への参照を取得
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// バイト数を取得
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// バイト列を取り出す
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// PNGシグネチャ（8バイト）
    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_decode_png_signature() {
        let payload = ImagePayload::decode("iVBORw0KGgo=").unwrap();

        assert_eq!(payload.as_bytes(), &PNG_SIGNATURE);
        assert_eq!(payload.len(), 8);
        assert!(!payload.is_empty());
    }

    #[test]
    fn test_decode_ignores_line_breaks() {
        let payload = ImagePayload::decode("iVBO\nRw0K\r\nGgo=\n").unwrap();
        assert_eq!(payload.into_bytes(), PNG_SIGNATURE.to_vec());
    }

    #[test]
    fn test_decode_empty_string() {
        let payload = ImagePayload::decode("").unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_decode_rejects_invalid_characters() {
        let result = ImagePayload::decode("not base64!!");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        // 1文字だけの入力は有効なBase64にならない
        assert!(ImagePayload::decode("i").is_err());
    }

    #[test]
    fn test_decode_ignores_trailing_bits() {
        // "QQ==" が正規形だが、最後のシンボルの余剰ビットが立っていても同じ1バイトになる
        assert_eq!(ImagePayload::decode("QR==").unwrap().as_bytes(), b"A");
        assert_eq!(ImagePayload::decode("QQ==").unwrap().as_bytes(), b"A");
    }

    #[test]
    fn test_decode_requires_padding() {
        assert!(ImagePayload::decode("QQ").is_err());
    }

    #[test]
    fn test_encode_matches_standard_alphabet() {
        let payload = ImagePayload::from_bytes(PNG_SIGNATURE.to_vec());
        assert_eq!(payload.encode(), "iVBORw0KGgo=");
    }

    #[test]
    fn test_decode_error_display() {
        let err = ImagePayload::decode("@@@@").unwrap_err();
        assert!(
            err.to_string()
                .starts_with("image_dataのBase64デコードに失敗しました: ")
        );
    }
}
