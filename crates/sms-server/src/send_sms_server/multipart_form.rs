use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use sms_dispatch::{
    parse_receivers_field, DispatchRequest, DispatchRequestLimits,
    VALIDATION_REASON_ATTACHMENT_UNSUPPORTED,
};
use sms_gateway::{GatewayAttachment, MediaKind};

use super::types::SendSmsApiError;

const FORM_FIELD_MESSAGE: &str = "message";
const FORM_FIELD_RECEIVERS: &str = "receivers";
const FORM_FIELD_IMAGE: &str = "image";

#[derive(Debug, Default)]
struct SendSmsForm {
    message: String,
    receivers: Vec<String>,
    attachment: Option<GatewayAttachment>,
}

/// Reads the `message`, `receivers` and optional `image` parts and builds a
/// validated request. Unknown parts are ignored.
pub(super) async fn read_send_sms_request(
    mut multipart: Multipart,
    limits: DispatchRequestLimits,
) -> Result<DispatchRequest, SendSmsApiError> {
    let mut form = SendSmsForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FORM_FIELD_MESSAGE => {
                form.message = field.text().await.map_err(multipart_error)?;
            }
            FORM_FIELD_RECEIVERS => {
                let raw = field.text().await.map_err(multipart_error)?;
                form.receivers = parse_receivers_field(&raw)
                    .map_err(|error| SendSmsApiError::from_dispatch_error(&error))?;
            }
            FORM_FIELD_IMAGE => {
                form.attachment = read_image_field(field).await?;
            }
            _ => {}
        }
    }

    DispatchRequest::new(&form.message, &form.receivers, form.attachment, limits)
        .map_err(|error| SendSmsApiError::from_dispatch_error(&error))
}

async fn read_image_field(field: Field<'_>) -> Result<Option<GatewayAttachment>, SendSmsApiError> {
    let file_name = field.file_name().unwrap_or_default().trim().to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();
    let bytes = field.bytes().await.map_err(multipart_error)?;
    // Browsers post an empty part when no file was picked.
    if file_name.is_empty() && bytes.is_empty() {
        return Ok(None);
    }

    let media_kind = MediaKind::from_content_type(&content_type)
        .or_else(|| MediaKind::from_file_name(&file_name))
        .ok_or_else(|| {
            SendSmsApiError::bad_request(
                VALIDATION_REASON_ATTACHMENT_UNSUPPORTED,
                format!(
                    "image '{}' has unsupported type '{}'; expected jpeg, png or gif",
                    file_name, content_type
                ),
            )
        })?;
    let file_name = if file_name.is_empty() {
        format!("attachment.{}", media_kind.as_str())
    } else {
        file_name
    };
    Ok(Some(GatewayAttachment {
        file_name,
        media_kind,
        bytes: bytes.to_vec(),
    }))
}

fn multipart_error(error: MultipartError) -> SendSmsApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return SendSmsApiError::payload_too_large(format!("request body exceeds the size limit: {error}"));
    }
    SendSmsApiError::bad_request("multipart_malformed", format!("invalid multipart body: {error}"))
}
