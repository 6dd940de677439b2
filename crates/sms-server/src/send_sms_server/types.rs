use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use sms_dispatch::{DispatchError, DispatchReport, SendResult};

pub(super) const REQUEST_REASON_NOT_MULTIPART: &str = "request_not_multipart";
pub(super) const REQUEST_REASON_TOO_LARGE: &str = "request_too_large";

#[derive(Debug)]
pub(super) struct SendSmsApiError {
    pub(super) status: StatusCode,
    pub(super) code: &'static str,
    pub(super) message: String,
    pub(super) details: Option<Value>,
}

impl SendSmsApiError {
    pub(super) fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub(super) fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub(super) fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, REQUEST_REASON_TOO_LARGE, message)
    }

    pub(super) fn from_dispatch_error(error: &DispatchError) -> Self {
        match error {
            DispatchError::Validation { code, message } => Self::bad_request(*code, message.clone()),
            DispatchError::Configuration(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "dispatch_configuration_error",
                message.clone(),
            ),
            DispatchError::Upload(cause) => Self {
                details: serde_json::to_value(cause).ok(),
                ..Self::new(StatusCode::BAD_GATEWAY, "upload_failed", error.to_string())
            },
            DispatchError::Cancelled => Self::new(
                StatusCode::GATEWAY_TIMEOUT,
                sms_dispatch::SEND_REASON_CANCELLED,
                error.to_string(),
            ),
        }
    }
}

impl IntoResponse for SendSmsApiError {
    fn into_response(self) -> Response {
        let error_type = if self.status.is_client_error() {
            "invalid_request_error"
        } else {
            "server_error"
        };
        let mut error = json!({
            "type": error_type,
            "code": self.code,
            "message": self.message,
        });
        if let Some(details) = self.details {
            error["details"] = details;
        }
        (
            self.status,
            Json(json!({
                "success": false,
                "error": error,
            })),
        )
            .into_response()
    }
}

/// Renders the JSON body returned for a completed dispatch.
pub fn render_send_sms_response(report: &DispatchReport) -> Value {
    let results = report
        .outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            SendResult::Success { data } => json!({
                "to": outcome.recipient,
                "success": true,
                "data": data,
            }),
            SendResult::Failure { error } => json!({
                "to": outcome.recipient,
                "success": false,
                "error": error,
            }),
        })
        .collect::<Vec<_>>();
    json!({
        "success": true,
        "all_succeeded": report.all_succeeded(),
        "attempted": report.attempted,
        "succeeded": report.succeeded,
        "failed": report.failed,
        "cancelled": report.cancelled,
        "media_reference": report.media_reference,
        "results": results,
    })
}
