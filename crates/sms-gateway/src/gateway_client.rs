//! Gateway client seam and its reqwest-backed implementation.
//!
//! `GatewayClient` is the only boundary the dispatch layer talks to. The HTTP
//! implementation applies a per-call timeout to each upload and send, never
//! follows redirects, and classifies non-success responses into
//! `GatewayCallError` reason codes.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use serde_json::Value;

use crate::gateway_contract::{
    extract_file_id, extract_message_id, GatewayAcceptance, GatewayAttachment, MediaReference,
    SendPayload, GATEWAY_SEND_PATH, GATEWAY_UPLOAD_PATH,
};
use crate::gateway_credentials::GatewayCredential;
use crate::gateway_error::{
    truncate_detail, GatewayCallError, GATEWAY_REASON_INVALID_ATTACHMENT,
    GATEWAY_REASON_INVALID_RESPONSE,
};

pub const DEFAULT_GATEWAY_API_BASE: &str = "https://api.solapi.com";

#[async_trait]
/// Remote operations a dispatch needs from the messaging gateway.
pub trait GatewayClient: Send + Sync {
    async fn upload_media(
        &self,
        credential: &GatewayCredential,
        attachment: &GatewayAttachment,
    ) -> Result<MediaReference, GatewayCallError>;

    async fn send_message(
        &self,
        credential: &GatewayCredential,
        payload: &SendPayload,
    ) -> Result<GatewayAcceptance, GatewayCallError>;
}

#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    pub api_base: String,
    pub upload_timeout_ms: u64,
    pub send_timeout_ms: u64,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GATEWAY_API_BASE.to_string(),
            upload_timeout_ms: 15_000,
            send_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    config: HttpGatewayConfig,
    client: reqwest::Client,
}

impl HttpGatewayClient {
    pub fn new(config: HttpGatewayConfig) -> Result<Self> {
        if config.api_base.trim().is_empty() {
            anyhow::bail!("gateway api base cannot be empty");
        }
        if config.upload_timeout_ms == 0 || config.send_timeout_ms == 0 {
            anyhow::bail!("gateway upload and send timeouts must be greater than 0");
        }
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .context("failed to build gateway http client")?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim().trim_end_matches('/'), path)
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn upload_media(
        &self,
        credential: &GatewayCredential,
        attachment: &GatewayAttachment,
    ) -> Result<MediaReference, GatewayCallError> {
        let endpoint = self.endpoint(GATEWAY_UPLOAD_PATH);
        let file_part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(attachment.media_kind.content_type())
            .map_err(|error| {
                GatewayCallError::new(
                    GATEWAY_REASON_INVALID_ATTACHMENT,
                    &endpoint,
                    error.to_string(),
                )
            })?;
        let form = Form::new()
            .part("file", file_part)
            .text("type", attachment.media_kind.upload_type_tag());

        let started = Instant::now();
        let response = self
            .client
            .post(&endpoint)
            .timeout(Duration::from_millis(self.config.upload_timeout_ms))
            .header(AUTHORIZATION, credential.authorization_header())
            .multipart(form)
            .send()
            .await
            .map_err(|error| {
                GatewayCallError::from_transport(&endpoint, &error, self.config.upload_timeout_ms)
            })?;
        let status = response.status();
        let body_raw = response.text().await.map_err(|error| {
            GatewayCallError::from_transport(&endpoint, &error, self.config.upload_timeout_ms)
        })?;
        tracing::debug!(
            endpoint = endpoint.as_str(),
            status = status.as_u16(),
            bytes = attachment.bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gateway media upload finished"
        );
        if !status.is_success() {
            return Err(GatewayCallError::from_status(&endpoint, status, &body_raw));
        }

        let body = serde_json::from_str::<Value>(&body_raw).unwrap_or(Value::Null);
        extract_file_id(&body)
            .map(MediaReference::new)
            .ok_or_else(|| GatewayCallError {
                http_status: Some(status.as_u16()),
                ..GatewayCallError::new(
                    GATEWAY_REASON_INVALID_RESPONSE,
                    &endpoint,
                    format!(
                        "upload response did not include a fileId: {}",
                        truncate_detail(&body_raw)
                    ),
                )
            })
    }

    async fn send_message(
        &self,
        credential: &GatewayCredential,
        payload: &SendPayload,
    ) -> Result<GatewayAcceptance, GatewayCallError> {
        let endpoint = self.endpoint(GATEWAY_SEND_PATH);
        let started = Instant::now();
        let response = self
            .client
            .post(&endpoint)
            .timeout(Duration::from_millis(self.config.send_timeout_ms))
            .header(AUTHORIZATION, credential.authorization_header())
            .json(&payload.to_request_body())
            .send()
            .await
            .map_err(|error| {
                GatewayCallError::from_transport(&endpoint, &error, self.config.send_timeout_ms)
            })?;
        let status = response.status();
        let body_raw = response.text().await.map_err(|error| {
            GatewayCallError::from_transport(&endpoint, &error, self.config.send_timeout_ms)
        })?;
        tracing::debug!(
            endpoint = endpoint.as_str(),
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gateway send finished"
        );
        if !status.is_success() {
            return Err(GatewayCallError::from_status(&endpoint, status, &body_raw));
        }

        let body = serde_json::from_str::<Value>(&body_raw).unwrap_or(Value::Null);
        Ok(GatewayAcceptance {
            http_status: status.as_u16(),
            message_id: extract_message_id(&body),
            body,
        })
    }
}
