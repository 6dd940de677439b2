use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use sms_dispatch::{
    dispatch_cancellation, load_customer_records, render_dispatch_report,
    select_recipient_phones, DispatchOrchestrator, DispatchReport, DispatchRequest, SendResult,
};
use sms_gateway::{GatewayAttachment, MediaKind};

use crate::bootstrap_helpers::wait_for_interrupt;
use crate::cli_args::SendArgs;

pub(crate) async fn execute_send_command(
    orchestrator: &DispatchOrchestrator,
    args: &SendArgs,
) -> Result<DispatchReport> {
    let recipients = collect_recipients(args)?;
    let attachment = match args.image.as_deref() {
        Some(path) => Some(read_image_attachment(path).await?),
        None => None,
    };
    let request = DispatchRequest::new(
        &args.message,
        &recipients,
        attachment,
        orchestrator.request_limits(),
    )
    .context("invalid send request")?;

    let (handle, cancellation) = dispatch_cancellation();
    let deadline = args.timeout_ms.map(Duration::from_millis);
    let watcher = tokio::spawn(async move {
        match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = wait_for_interrupt() => {}
                    _ = tokio::time::sleep(deadline) => {}
                }
            }
            None => wait_for_interrupt().await,
        }
        handle.cancel();
    });
    let result = orchestrator.dispatch(request, cancellation).await;
    watcher.abort();
    result.context("sms dispatch failed")
}

fn collect_recipients(args: &SendArgs) -> Result<Vec<String>> {
    let mut recipients = args.to.clone();
    if let Some(path) = args.records.as_deref() {
        let records = load_customer_records(path)?;
        let selected = select_recipient_phones(&records, &args.recipient_filter());
        tracing::debug!(
            records = records.len(),
            selected = selected.len(),
            "selected recipients from customer records"
        );
        recipients.extend(selected);
    }
    Ok(recipients)
}

async fn read_image_attachment(path: &Path) -> Result<GatewayAttachment> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    let Some(media_kind) = MediaKind::from_file_name(&file_name) else {
        bail!(
            "unsupported image '{}'; expected a .jpg, .jpeg, .png or .gif file",
            path.display()
        );
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read image {}", path.display()))?;
    Ok(GatewayAttachment {
        file_name,
        media_kind,
        bytes,
    })
}

pub(crate) fn render_send_report(report: &DispatchReport) -> String {
    let mut lines = vec![render_dispatch_report(report)];
    for outcome in &report.outcomes {
        let line = match &outcome.result {
            SendResult::Success { data } => format!(
                "  [{}] {} success message_id={}",
                outcome.index,
                outcome.recipient,
                data.message_id.as_deref().unwrap_or("none")
            ),
            SendResult::Failure { error } => format!(
                "  [{}] {} failure reason_code={} detail={}",
                outcome.index, outcome.recipient, error.reason_code, error.detail
            ),
        };
        lines.push(line);
    }
    lines.join("\n")
}
