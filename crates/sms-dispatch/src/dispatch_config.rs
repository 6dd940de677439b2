//! Process-wide dispatch configuration.
//!
//! The configuration is an explicit value handed to the orchestrator at
//! construction. Nothing in this crate reads the environment.

use sms_gateway::{GatewaySigningKey, HttpGatewayConfig, DEFAULT_GATEWAY_API_BASE};

use crate::dispatch_error::DispatchError;

pub const DEFAULT_WORKER_POOL_CAP: usize = 64;
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 200 * 1024;
pub const DEFAULT_MAX_TEXT_CHARS: usize = 2_000;

#[derive(Clone)]
pub struct DispatchConfig {
    pub api_base: String,
    pub api_key: String,
    pub api_secret: String,
    pub sender: String,
    pub upload_timeout_ms: u64,
    pub send_timeout_ms: u64,
    /// Explicit in-flight bound. When unset the bound follows the recipient
    /// count, capped at `worker_pool_cap`.
    pub max_in_flight: Option<usize>,
    pub worker_pool_cap: usize,
    pub max_attachment_bytes: usize,
    pub max_text_chars: usize,
}

impl std::fmt::Debug for DispatchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key)
            .field("api_secret", &"(redacted)")
            .field("sender", &self.sender)
            .field("upload_timeout_ms", &self.upload_timeout_ms)
            .field("send_timeout_ms", &self.send_timeout_ms)
            .field("max_in_flight", &self.max_in_flight)
            .field("worker_pool_cap", &self.worker_pool_cap)
            .field("max_attachment_bytes", &self.max_attachment_bytes)
            .field("max_text_chars", &self.max_text_chars)
            .finish()
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GATEWAY_API_BASE.to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            sender: String::new(),
            upload_timeout_ms: 15_000,
            send_timeout_ms: 10_000,
            max_in_flight: None,
            worker_pool_cap: DEFAULT_WORKER_POOL_CAP,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRequestLimits {
    pub max_text_chars: usize,
    pub max_attachment_bytes: usize,
}

impl Default for DispatchRequestLimits {
    fn default() -> Self {
        Self {
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.api_base.trim().is_empty() {
            return Err(DispatchError::Configuration(
                "gateway api base is not configured".to_string(),
            ));
        }
        self.signing_key()?;
        if self.sender.trim().is_empty() {
            return Err(DispatchError::Configuration(
                "sender number is not configured".to_string(),
            ));
        }
        if self.upload_timeout_ms == 0 || self.send_timeout_ms == 0 {
            return Err(DispatchError::Configuration(
                "upload and send timeouts must be greater than 0".to_string(),
            ));
        }
        if self.worker_pool_cap == 0 || self.max_in_flight == Some(0) {
            return Err(DispatchError::Configuration(
                "dispatch concurrency bounds must be greater than 0".to_string(),
            ));
        }
        if self.max_text_chars == 0 || self.max_attachment_bytes == 0 {
            return Err(DispatchError::Configuration(
                "request limits must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn signing_key(&self) -> Result<GatewaySigningKey, DispatchError> {
        GatewaySigningKey::new(&self.api_key, &self.api_secret)
            .map_err(|error| DispatchError::Configuration(error.to_string()))
    }

    pub fn http_gateway_config(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            api_base: self.api_base.trim().to_string(),
            upload_timeout_ms: self.upload_timeout_ms,
            send_timeout_ms: self.send_timeout_ms,
        }
    }

    pub fn request_limits(&self) -> DispatchRequestLimits {
        DispatchRequestLimits {
            max_text_chars: self.max_text_chars,
            max_attachment_bytes: self.max_attachment_bytes,
        }
    }

    pub fn effective_concurrency(&self, recipient_count: usize) -> usize {
        let bound = match self.max_in_flight {
            Some(max_in_flight) => max_in_flight,
            None => self.worker_pool_cap,
        };
        recipient_count.min(bound).max(1)
    }
}
