//! Structured failures for individual gateway calls.
//!
//! Each failure carries a stable reason code and a retryable hint so callers
//! can report per-recipient outcomes without parsing free-form text.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const GATEWAY_REASON_TRANSPORT_ERROR: &str = "gateway_transport_error";
pub const GATEWAY_REASON_TIMEOUT: &str = "gateway_timeout";
pub const GATEWAY_REASON_RATE_LIMITED: &str = "gateway_rate_limited";
pub const GATEWAY_REASON_PROVIDER_UNAVAILABLE: &str = "gateway_provider_unavailable";
pub const GATEWAY_REASON_REQUEST_REJECTED: &str = "gateway_request_rejected";
pub const GATEWAY_REASON_UNKNOWN_HTTP_FAILURE: &str = "gateway_unknown_http_failure";
pub const GATEWAY_REASON_INVALID_RESPONSE: &str = "gateway_invalid_response";
pub const GATEWAY_REASON_INVALID_ATTACHMENT: &str = "gateway_invalid_attachment";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("reason_code={reason_code} retryable={retryable} endpoint={endpoint} detail={detail}")]
pub struct GatewayCallError {
    pub reason_code: String,
    pub detail: String,
    pub retryable: bool,
    pub endpoint: String,
    pub http_status: Option<u16>,
    pub response_body: Option<Value>,
}

impl GatewayCallError {
    pub fn new(reason_code: &str, endpoint: &str, detail: impl Into<String>) -> Self {
        Self {
            reason_code: reason_code.to_string(),
            detail: detail.into(),
            retryable: false,
            endpoint: endpoint.to_string(),
            http_status: None,
            response_body: None,
        }
    }

    pub fn timeout(endpoint: &str, timeout_ms: u64) -> Self {
        Self {
            retryable: true,
            ..Self::new(
                GATEWAY_REASON_TIMEOUT,
                endpoint,
                format!("gateway call exceeded {timeout_ms}ms"),
            )
        }
    }

    pub fn from_transport(endpoint: &str, error: &reqwest::Error, timeout_ms: u64) -> Self {
        if error.is_timeout() {
            return Self::timeout(endpoint, timeout_ms);
        }
        Self {
            retryable: true,
            ..Self::new(GATEWAY_REASON_TRANSPORT_ERROR, endpoint, error.to_string())
        }
    }

    pub fn from_status(endpoint: &str, status: StatusCode, body_raw: &str) -> Self {
        let (reason_code, retryable) = classify_gateway_status(status);
        Self {
            reason_code: reason_code.to_string(),
            detail: truncate_detail(body_raw),
            retryable,
            endpoint: endpoint.to_string(),
            http_status: Some(status.as_u16()),
            response_body: serde_json::from_str::<Value>(body_raw).ok(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.reason_code == GATEWAY_REASON_TIMEOUT
    }
}

pub fn classify_gateway_status(status: StatusCode) -> (&'static str, bool) {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return (GATEWAY_REASON_RATE_LIMITED, true);
    }
    if status.is_server_error() {
        return (GATEWAY_REASON_PROVIDER_UNAVAILABLE, true);
    }
    if status.is_client_error() {
        return (GATEWAY_REASON_REQUEST_REJECTED, false);
    }
    (GATEWAY_REASON_UNKNOWN_HTTP_FAILURE, true)
}

pub(crate) fn truncate_detail(raw: &str) -> String {
    const LIMIT: usize = 512;
    let trimmed = raw.trim();
    if trimmed.chars().count() <= LIMIT {
        return trimmed.to_string();
    }
    let mut output: String = trimmed.chars().take(LIMIT).collect();
    output.push_str("...");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_classify_gateway_status_maps_retryability() {
        assert_eq!(
            classify_gateway_status(StatusCode::TOO_MANY_REQUESTS),
            (GATEWAY_REASON_RATE_LIMITED, true)
        );
        assert_eq!(
            classify_gateway_status(StatusCode::BAD_GATEWAY),
            (GATEWAY_REASON_PROVIDER_UNAVAILABLE, true)
        );
        assert_eq!(
            classify_gateway_status(StatusCode::BAD_REQUEST),
            (GATEWAY_REASON_REQUEST_REJECTED, false)
        );
    }

    #[test]
    fn unit_from_status_keeps_json_rejection_payload() {
        let error = GatewayCallError::from_status(
            "https://gateway.test/messages/v4/send",
            StatusCode::BAD_REQUEST,
            r#"{"errorCode":"ValidationError","errorMessage":"invalid to"}"#,
        );
        assert_eq!(error.http_status, Some(400));
        assert_eq!(
            error
                .response_body
                .as_ref()
                .and_then(|body| body.get("errorCode"))
                .and_then(Value::as_str),
            Some("ValidationError")
        );
    }

    #[test]
    fn unit_truncate_detail_caps_long_bodies() {
        let raw = "x".repeat(600);
        let truncated = truncate_detail(&raw);
        assert_eq!(truncated.chars().count(), 515);
        assert!(truncated.ends_with("..."));
    }
}
