//! axum server exposing `POST /api/send-sms` and `GET /healthz`.
//!
//! Each request is validated before any gateway traffic, then dispatched under
//! a per-request deadline that a server shutdown also trips. A dispatch that
//! completes is always a 200 carrying per-recipient results, even when some
//! recipients failed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use sms_dispatch::{dispatch_cancellation, DispatchCancellation, DispatchOrchestrator};
use tokio::net::TcpListener;

mod multipart_form;
mod types;

use multipart_form::read_send_sms_request;
use types::{SendSmsApiError, REQUEST_REASON_NOT_MULTIPART};
pub use types::render_send_sms_response;

pub const SEND_SMS_ENDPOINT: &str = "/api/send-sms";
pub const HEALTHZ_ENDPOINT: &str = "/healthz";
pub const DEFAULT_SEND_SMS_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
/// Room for the JSON `receivers` array on top of the attachment and text.
const RECEIVERS_FIELD_BUDGET_BYTES: usize = 512 * 1024;

#[derive(Clone)]
pub struct SendSmsServerConfig {
    pub orchestrator: Arc<DispatchOrchestrator>,
    pub bind: String,
    /// Caller deadline; sends still outstanding when it elapses are cancelled.
    pub request_timeout_ms: u64,
}

struct SendSmsServerState {
    orchestrator: Arc<DispatchOrchestrator>,
    request_timeout: Duration,
    shutdown: DispatchCancellation,
}

impl SendSmsServerState {
    fn new(config: &SendSmsServerConfig, shutdown: DispatchCancellation) -> Self {
        Self {
            orchestrator: Arc::clone(&config.orchestrator),
            request_timeout: Duration::from_millis(config.request_timeout_ms.max(1)),
            shutdown,
        }
    }
}

pub async fn run_send_sms_server(config: SendSmsServerConfig) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind send-sms server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound send-sms server address")?;

    println!(
        "send-sms server listening: endpoint={} addr={} sender={}",
        SEND_SMS_ENDPOINT,
        local_addr,
        config.orchestrator.config().sender
    );
    tracing::info!(addr = %local_addr, "send-sms server started");

    let (shutdown_handle, shutdown) = dispatch_cancellation();
    let app = build_send_sms_router_with_shutdown(&config, shutdown);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("send-sms server interrupted; cancelling in-flight dispatches");
            shutdown_handle.cancel();
        })
        .await
        .context("send-sms server exited unexpectedly")?;
    tracing::info!("send-sms server stopped");
    Ok(())
}

pub fn build_send_sms_router(config: &SendSmsServerConfig) -> Router {
    build_send_sms_router_with_shutdown(config, DispatchCancellation::never())
}

/// Builds the router with a shared shutdown signal. Cancelling `shutdown`
/// cancels every dispatch still in flight; their outstanding sends are
/// reported as cancelled.
pub fn build_send_sms_router_with_shutdown(
    config: &SendSmsServerConfig,
    shutdown: DispatchCancellation,
) -> Router {
    let state = Arc::new(SendSmsServerState::new(config, shutdown));
    let limits = state.orchestrator.request_limits();
    let body_limit = limits.max_attachment_bytes
        + limits.max_text_chars * 4
        + RECEIVERS_FIELD_BUDGET_BYTES
        + MULTIPART_OVERHEAD_BYTES;
    Router::new()
        .route(SEND_SMS_ENDPOINT, post(handle_send_sms))
        .route(HEALTHZ_ENDPOINT, get(handle_healthz))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn handle_healthz() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

async fn handle_send_sms(
    State(state): State<Arc<SendSmsServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!(rejection = %rejection.body_text(), "rejected non-multipart send-sms request");
            return SendSmsApiError::bad_request(
                REQUEST_REASON_NOT_MULTIPART,
                format!(
                    "expected a multipart/form-data body: {}",
                    rejection.body_text()
                ),
            )
            .into_response();
        }
    };
    let request =
        match read_send_sms_request(multipart, state.orchestrator.request_limits()).await {
            Ok(request) => request,
            Err(error) => {
                tracing::debug!(code = error.code, message = %error.message, "rejected send-sms request");
                return error.into_response();
            }
        };

    let (handle, cancellation) = dispatch_cancellation();
    let deadline = handle.cancel_after_or_with(state.request_timeout, state.shutdown.clone());
    let result = state.orchestrator.dispatch(request, cancellation).await;
    deadline.abort();

    match result {
        Ok(report) => (StatusCode::OK, Json(render_send_sms_response(&report))).into_response(),
        Err(error) => {
            tracing::error!(reason_code = error.reason_code(), error = %error, "send-sms dispatch failed");
            SendSmsApiError::from_dispatch_error(&error).into_response()
        }
    }
}
