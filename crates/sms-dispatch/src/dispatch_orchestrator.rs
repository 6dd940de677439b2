//! Dispatch orchestration: sign, optionally upload, fan out, aggregate.
//!
//! One credential is signed per request and shared by the upload and every
//! send. Sends run as tasks in a `JoinSet` gated by a semaphore; each task
//! settles into exactly one outcome (success, gateway failure, timeout or
//! cancellation) and the join is a hard barrier before aggregation. Once the
//! fan-out starts the request always completes with a report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sms_gateway::{
    GatewayAcceptance, GatewayAttachment, GatewayCallError, GatewayClient, GatewayCredential,
    GatewaySigningKey, MediaReference, SendPayload, GATEWAY_SEND_PATH, GATEWAY_UPLOAD_PATH,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::dispatch_cancellation::DispatchCancellation;
use crate::dispatch_config::{DispatchConfig, DispatchRequestLimits};
use crate::dispatch_error::{DispatchError, SendFailure};
use crate::dispatch_report::{DispatchReport, SendOutcome};
use crate::dispatch_request::DispatchRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Validating,
    Signing,
    UploadingAttachment,
    Dispatching,
    Aggregating,
    Completed,
    ValidationFailed,
    UploadFailed,
    Cancelled,
}

impl DispatchPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Signing => "signing",
            Self::UploadingAttachment => "uploading_attachment",
            Self::Dispatching => "dispatching",
            Self::Aggregating => "aggregating",
            Self::Completed => "completed",
            Self::ValidationFailed => "validation_failed",
            Self::UploadFailed => "upload_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl DispatchError {
    /// Terminal state a request ends in when it fails with this error.
    ///
    /// A configuration error can only surface while the credential is being
    /// signed, before any gateway traffic, so it is reported as a failed
    /// precondition alongside validation errors.
    pub fn terminal_phase(&self) -> DispatchPhase {
        match self {
            Self::Validation { .. } | Self::Configuration(_) => DispatchPhase::ValidationFailed,
            Self::Upload(_) => DispatchPhase::UploadFailed,
            Self::Cancelled => DispatchPhase::Cancelled,
        }
    }
}

pub struct DispatchOrchestrator {
    config: Arc<DispatchConfig>,
    signing_key: GatewaySigningKey,
    gateway: Arc<dyn GatewayClient>,
}

impl DispatchOrchestrator {
    pub fn new(
        config: DispatchConfig,
        gateway: Arc<dyn GatewayClient>,
    ) -> Result<Self, DispatchError> {
        config.validate()?;
        let signing_key = config.signing_key()?;
        Ok(Self {
            config: Arc::new(config),
            signing_key,
            gateway,
        })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn request_limits(&self) -> DispatchRequestLimits {
        self.config.request_limits()
    }

    pub async fn dispatch(
        &self,
        request: DispatchRequest,
        cancellation: DispatchCancellation,
    ) -> Result<DispatchReport, DispatchError> {
        let started = Instant::now();
        tracing::debug!(
            phase = DispatchPhase::Validating.as_str(),
            recipients = request.recipients().len(),
            has_attachment = request.attachment().is_some(),
            "sms dispatch accepted"
        );
        if cancellation.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        tracing::debug!(phase = DispatchPhase::Signing.as_str(), "signing gateway credential");
        let credential = self
            .signing_key
            .sign_now()
            .map_err(|error| DispatchError::Configuration(error.to_string()))?;

        let media_reference = match request.attachment() {
            Some(attachment) => Some(
                self.upload_attachment(&credential, attachment, cancellation.clone())
                    .await?,
            ),
            None => None,
        };

        let slots = self
            .fan_out(&request, &credential, media_reference.as_ref(), cancellation)
            .await;

        tracing::debug!(
            phase = DispatchPhase::Aggregating.as_str(),
            "aggregating send outcomes"
        );
        let report = DispatchReport::aggregate(
            request.recipients(),
            slots,
            media_reference.map(|reference| reference.as_str().to_string()),
        );
        tracing::info!(
            phase = DispatchPhase::Completed.as_str(),
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sms dispatch completed"
        );
        Ok(report)
    }

    async fn upload_attachment(
        &self,
        credential: &GatewayCredential,
        attachment: &GatewayAttachment,
        mut cancellation: DispatchCancellation,
    ) -> Result<MediaReference, DispatchError> {
        tracing::debug!(
            phase = DispatchPhase::UploadingAttachment.as_str(),
            file_name = attachment.file_name.as_str(),
            media_kind = attachment.media_kind.as_str(),
            bytes = attachment.bytes.len(),
            "uploading attachment"
        );
        let timeout_ms = self.config.upload_timeout_ms;
        let upload = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.gateway.upload_media(credential, attachment),
        );
        let result = tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(DispatchError::Cancelled),
            result = upload => match result {
                Ok(Ok(reference)) => Ok(reference),
                Ok(Err(error)) => Err(DispatchError::Upload(error)),
                Err(_) => Err(DispatchError::Upload(GatewayCallError::timeout(
                    GATEWAY_UPLOAD_PATH,
                    timeout_ms,
                ))),
            },
        };
        if let Err(error) = &result {
            tracing::error!(
                phase = error.terminal_phase().as_str(),
                reason_code = error.reason_code(),
                error = %error,
                "attachment upload aborted dispatch"
            );
        }
        result
    }

    async fn fan_out(
        &self,
        request: &DispatchRequest,
        credential: &GatewayCredential,
        media_reference: Option<&MediaReference>,
        cancellation: DispatchCancellation,
    ) -> Vec<Option<SendOutcome>> {
        let recipients = request.recipients();
        let concurrency = self.config.effective_concurrency(recipients.len());
        tracing::debug!(
            phase = DispatchPhase::Dispatching.as_str(),
            recipients = recipients.len(),
            concurrency,
            "fanning out sends"
        );

        let permits = Arc::new(Semaphore::new(concurrency));
        let mut slots: Vec<Option<SendOutcome>> = vec![None; recipients.len()];
        let mut tasks = JoinSet::new();
        for (index, recipient) in recipients.iter().enumerate() {
            if !recipient.is_well_formed() {
                tracing::warn!(
                    index,
                    recipient = %recipient.masked(),
                    "recipient is malformed; skipping gateway call"
                );
                slots[index] = Some(SendOutcome::new(
                    index,
                    recipient,
                    Err::<GatewayAcceptance, _>(SendFailure::malformed_recipient(recipient.raw())),
                ));
                continue;
            }

            let payload = SendPayload {
                to: recipient.as_str().to_string(),
                from: self.config.sender.trim().to_string(),
                text: request.message().to_string(),
                image_id: media_reference.map(|reference| reference.as_str().to_string()),
            };
            let send = send_one(
                Arc::clone(&self.gateway),
                credential.clone(),
                Arc::clone(&permits),
                payload,
                self.config.send_timeout_ms,
            );
            let mut cancellation = cancellation.clone();
            tasks.spawn(async move {
                let result = tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => Err(SendFailure::cancelled()),
                    result = send => result,
                };
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    let recipient = &recipients[index];
                    if let Err(failure) = &result {
                        tracing::warn!(
                            index,
                            recipient = %recipient.masked(),
                            reason_code = failure.reason_code.as_str(),
                            http_status = failure.http_status,
                            "send failed"
                        );
                    }
                    slots[index] = Some(SendOutcome::new(index, recipient, result));
                }
                Err(error) => {
                    tracing::warn!(error = %error, "send task ended without an outcome");
                }
            }
        }
        slots
    }
}

async fn send_one(
    gateway: Arc<dyn GatewayClient>,
    credential: GatewayCredential,
    permits: Arc<Semaphore>,
    payload: SendPayload,
    timeout_ms: u64,
) -> Result<GatewayAcceptance, SendFailure> {
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|_| SendFailure::task_aborted("dispatch worker pool closed"))?;
    match tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        gateway.send_message(&credential, &payload),
    )
    .await
    {
        Ok(result) => result.map_err(SendFailure::from),
        Err(_) => Err(SendFailure::from(GatewayCallError::timeout(
            GATEWAY_SEND_PATH,
            timeout_ms,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch_error::VALIDATION_REASON_EMPTY_MESSAGE;

    #[test]
    fn unit_terminal_phase_matches_failure_class() {
        assert_eq!(
            DispatchError::validation(VALIDATION_REASON_EMPTY_MESSAGE, "empty").terminal_phase(),
            DispatchPhase::ValidationFailed
        );
        assert_eq!(
            DispatchError::Upload(GatewayCallError::timeout(GATEWAY_UPLOAD_PATH, 10))
                .terminal_phase(),
            DispatchPhase::UploadFailed
        );
    }

    #[test]
    fn regression_cancelled_before_dispatching_has_its_own_terminal_phase() {
        assert_eq!(
            DispatchError::Cancelled.terminal_phase(),
            DispatchPhase::Cancelled
        );
        assert_eq!(DispatchPhase::Cancelled.as_str(), "cancelled");
        assert_eq!(
            DispatchError::Configuration("sender number is not configured".to_string())
                .terminal_phase(),
            DispatchPhase::ValidationFailed
        );
    }

    #[test]
    fn unit_phase_labels_are_snake_case() {
        assert_eq!(
            DispatchPhase::UploadingAttachment.as_str(),
            "uploading_attachment"
        );
        assert_eq!(DispatchPhase::Completed.as_str(), "completed");
    }
}
