//! Wire-level types exchanged with the messaging gateway.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GATEWAY_UPLOAD_PATH: &str = "/storage/v1/files";
pub const GATEWAY_SEND_PATH: &str = "/messages/v4/send";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Image formats the gateway accepts as MMS attachments.
pub enum MediaKind {
    Jpeg,
    Png,
    Gif,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }

    /// Type tag sent alongside the uploaded file.
    pub fn upload_type_tag(self) -> &'static str {
        "MMS"
    }

    pub fn from_content_type(raw: &str) -> Option<Self> {
        let essence = raw.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn from_file_name(raw: &str) -> Option<Self> {
        let (_, extension) = raw.trim().rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayAttachment {
    pub file_name: String,
    pub media_kind: MediaKind,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
/// Opaque id returned by the gateway's file store.
pub struct MediaReference(String);

impl MediaReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendPayload {
    pub to: String,
    pub from: String,
    pub text: String,
    #[serde(rename = "imageId", skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

impl SendPayload {
    pub fn to_request_body(&self) -> Value {
        serde_json::json!({ "message": self })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayAcceptance {
    pub http_status: u16,
    pub message_id: Option<String>,
    pub body: Value,
}

pub(crate) fn extract_file_id(payload: &Value) -> Option<String> {
    payload
        .get("fileId")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) fn extract_message_id(payload: &Value) -> Option<String> {
    payload
        .get("messageId")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unit_send_payload_omits_missing_image_id() {
        let payload = SendPayload {
            to: "01011112222".to_string(),
            from: "0212345678".to_string(),
            text: "hello".to_string(),
            image_id: None,
        };
        assert_eq!(
            payload.to_request_body(),
            json!({"message": {"to": "01011112222", "from": "0212345678", "text": "hello"}})
        );
    }

    #[test]
    fn unit_send_payload_renames_image_id() {
        let payload = SendPayload {
            to: "01011112222".to_string(),
            from: "0212345678".to_string(),
            text: "hello".to_string(),
            image_id: Some("ST01FZ".to_string()),
        };
        assert_eq!(payload.to_request_body()["message"]["imageId"], "ST01FZ");
    }

    #[test]
    fn unit_media_kind_detection_accepts_common_spellings() {
        assert_eq!(
            MediaKind::from_content_type("image/JPEG; charset=binary"),
            Some(MediaKind::Jpeg)
        );
        assert_eq!(MediaKind::from_file_name("promo.PNG"), Some(MediaKind::Png));
        assert_eq!(MediaKind::from_file_name("notes.txt"), None);
        assert_eq!(MediaKind::from_file_name("noextension"), None);
    }

    #[test]
    fn unit_extract_file_id_ignores_blank_values() {
        assert_eq!(extract_file_id(&json!({"fileId": "  "})), None);
        assert_eq!(
            extract_file_id(&json!({"fileId": "ST01"})).as_deref(),
            Some("ST01")
        );
    }
}
