//! Per-recipient outcomes and the aggregated dispatch report.

use serde::Serialize;
use sms_gateway::GatewayAcceptance;

use crate::dispatch_error::{SendFailure, SendFailureKind};
use crate::dispatch_request::Recipient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendResult {
    Success { data: GatewayAcceptance },
    Failure { error: SendFailure },
}

impl From<Result<GatewayAcceptance, SendFailure>> for SendResult {
    fn from(result: Result<GatewayAcceptance, SendFailure>) -> Self {
        match result {
            Ok(data) => Self::Success { data },
            Err(error) => Self::Failure { error },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    /// Position of the recipient in the request.
    pub index: usize,
    pub recipient: String,
    #[serde(flatten)]
    pub result: SendResult,
}

impl SendOutcome {
    pub fn new(index: usize, recipient: &Recipient, result: impl Into<SendResult>) -> Self {
        Self {
            index,
            recipient: recipient.as_str().to_string(),
            result: result.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, SendResult::Success { .. })
    }

    pub fn failure(&self) -> Option<&SendFailure> {
        match &self.result {
            SendResult::Failure { error } => Some(error),
            SendResult::Success { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub media_reference: Option<String>,
    pub outcomes: Vec<SendOutcome>,
}

impl DispatchReport {
    /// Joins settled fan-out slots into a report. A slot left empty (its task
    /// panicked or was aborted) becomes a failed outcome for that recipient.
    pub fn aggregate(
        recipients: &[Recipient],
        slots: Vec<Option<SendOutcome>>,
        media_reference: Option<String>,
    ) -> Self {
        let outcomes: Vec<SendOutcome> = recipients
            .iter()
            .zip(slots.into_iter().chain(std::iter::repeat(None)))
            .enumerate()
            .map(|(index, (recipient, slot))| {
                slot.unwrap_or_else(|| {
                    SendOutcome::new(
                        index,
                        recipient,
                        SendResult::Failure {
                            error: SendFailure::task_aborted(
                                "send task ended without reporting an outcome",
                            ),
                        },
                    )
                })
            })
            .collect();

        let succeeded = outcomes.iter().filter(|outcome| outcome.is_success()).count();
        let cancelled = outcomes
            .iter()
            .filter_map(SendOutcome::failure)
            .filter(|failure| failure.kind == SendFailureKind::Cancelled)
            .count();
        Self {
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            cancelled,
            media_reference,
            outcomes,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

pub fn render_dispatch_report(report: &DispatchReport) -> String {
    format!(
        "sms dispatch: attempted={} succeeded={} failed={} cancelled={} media_reference={}",
        report.attempted,
        report.succeeded,
        report.failed,
        report.cancelled,
        report.media_reference.as_deref().unwrap_or("none")
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn recipients(raw: &[&str]) -> Vec<Recipient> {
        raw.iter()
            .map(|value| Recipient::parse(value).expect("recipient"))
            .collect()
    }

    fn accepted() -> GatewayAcceptance {
        GatewayAcceptance {
            http_status: 200,
            message_id: Some("M1".to_string()),
            body: json!({"messageId": "M1"}),
        }
    }

    #[test]
    fn unit_aggregate_fills_missing_slots_as_task_aborted() {
        let recipients = recipients(&["01011112222", "01033334444"]);
        let slots = vec![
            Some(SendOutcome::new(
                0,
                &recipients[0],
                Ok::<_, SendFailure>(accepted()),
            )),
            None,
        ];
        let report = DispatchReport::aggregate(&recipients, slots, None);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        let failure = report.outcomes[1].failure().expect("failure");
        assert_eq!(failure.kind, SendFailureKind::TaskAborted);
        assert_eq!(report.outcomes[1].recipient, "01033334444");
    }

    #[test]
    fn unit_aggregate_counts_cancelled_within_failed() {
        let recipients = recipients(&["01011112222", "01033334444"]);
        let slots = vec![
            Some(SendOutcome::new(
                0,
                &recipients[0],
                Err::<GatewayAcceptance, _>(SendFailure::cancelled()),
            )),
            Some(SendOutcome::new(1, &recipients[1], Ok::<_, SendFailure>(accepted()))),
        ];
        let report = DispatchReport::aggregate(&recipients, slots, Some("ST01".to_string()));
        assert_eq!(report.cancelled, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.all_succeeded());
        assert_eq!(
            render_dispatch_report(&report),
            "sms dispatch: attempted=2 succeeded=1 failed=1 cancelled=1 media_reference=ST01"
        );
    }

    #[test]
    fn unit_outcome_serializes_flat_status_tag() {
        let recipients = recipients(&["01011112222"]);
        let outcome = SendOutcome::new(0, &recipients[0], Ok::<_, SendFailure>(accepted()));
        let value = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(value["status"], "success");
        assert_eq!(value["recipient"], "01011112222");
        assert_eq!(value["data"]["message_id"], "M1");
    }
}
