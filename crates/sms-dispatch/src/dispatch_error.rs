//! Top-level dispatch failures and per-recipient send failures.
//!
//! `DispatchError` aborts the whole request and is only produced before the
//! fan-out starts. `SendFailure` is captured into a single recipient's outcome
//! and never escalates.

use serde::Serialize;
use serde_json::Value;
use sms_gateway::GatewayCallError;
use thiserror::Error;

pub const VALIDATION_REASON_EMPTY_MESSAGE: &str = "message_empty";
pub const VALIDATION_REASON_MESSAGE_TOO_LONG: &str = "message_too_long";
pub const VALIDATION_REASON_EMPTY_RECIPIENTS: &str = "recipients_empty";
pub const VALIDATION_REASON_BLANK_RECIPIENT: &str = "recipient_blank";
pub const VALIDATION_REASON_RECEIVERS_MALFORMED: &str = "receivers_malformed";
pub const VALIDATION_REASON_ATTACHMENT_EMPTY: &str = "attachment_empty";
pub const VALIDATION_REASON_ATTACHMENT_TOO_LARGE: &str = "attachment_too_large";
pub const VALIDATION_REASON_ATTACHMENT_UNSUPPORTED: &str = "attachment_unsupported_type";

pub const SEND_REASON_RECIPIENT_MALFORMED: &str = "recipient_malformed";
pub const SEND_REASON_CANCELLED: &str = "dispatch_cancelled";
pub const SEND_REASON_TASK_ABORTED: &str = "dispatch_task_aborted";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("invalid dispatch request ({code}): {message}")]
    Validation { code: &'static str, message: String },
    #[error("dispatch configuration error: {0}")]
    Configuration(String),
    #[error("attachment upload failed: {0}")]
    Upload(GatewayCallError),
    #[error("dispatch cancelled before any send was attempted")]
    Cancelled,
}

impl DispatchError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn reason_code(&self) -> &str {
        match self {
            Self::Validation { code, .. } => code,
            Self::Configuration(_) => "dispatch_configuration_error",
            Self::Upload(_) => "upload_failed",
            Self::Cancelled => SEND_REASON_CANCELLED,
        }
    }

    /// True when the caller supplied bad input, as opposed to a server-side fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendFailureKind {
    Gateway,
    Timeout,
    Cancelled,
    MalformedRecipient,
    TaskAborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendFailure {
    pub kind: SendFailureKind,
    pub reason_code: String,
    pub detail: String,
    pub retryable: bool,
    pub http_status: Option<u16>,
    pub response_body: Option<Value>,
}

impl SendFailure {
    fn local(kind: SendFailureKind, reason_code: &str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            reason_code: reason_code.to_string(),
            detail: detail.into(),
            retryable: false,
            http_status: None,
            response_body: None,
        }
    }

    pub fn malformed_recipient(raw: &str) -> Self {
        Self::local(
            SendFailureKind::MalformedRecipient,
            SEND_REASON_RECIPIENT_MALFORMED,
            format!("recipient '{raw}' is not an 8-15 digit phone number"),
        )
    }

    pub fn cancelled() -> Self {
        Self {
            retryable: true,
            ..Self::local(
                SendFailureKind::Cancelled,
                SEND_REASON_CANCELLED,
                "dispatch was cancelled before this send settled",
            )
        }
    }

    pub fn task_aborted(detail: impl Into<String>) -> Self {
        Self::local(
            SendFailureKind::TaskAborted,
            SEND_REASON_TASK_ABORTED,
            detail,
        )
    }
}

impl From<GatewayCallError> for SendFailure {
    fn from(error: GatewayCallError) -> Self {
        let kind = if error.is_timeout() {
            SendFailureKind::Timeout
        } else {
            SendFailureKind::Gateway
        };
        Self {
            kind,
            reason_code: error.reason_code,
            detail: error.detail,
            retryable: error.retryable,
            http_status: error.http_status,
            response_body: error.response_body,
        }
    }
}
