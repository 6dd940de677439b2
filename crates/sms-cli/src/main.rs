mod bootstrap_helpers;
mod cli_args;
mod send_command;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sms_dispatch::DispatchOrchestrator;
use sms_gateway::HttpGatewayClient;
use sms_server::{run_send_sms_server, SendSmsServerConfig};

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::{Cli, CliCommand};
use crate::send_command::{execute_send_command, render_send_report};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}

async fn run_cli(cli: Cli) -> Result<()> {
    let config = cli.gateway.to_dispatch_config();
    let gateway = HttpGatewayClient::new(config.http_gateway_config())?;
    let orchestrator = DispatchOrchestrator::new(config, Arc::new(gateway))
        .context("invalid dispatch configuration")?;

    match cli.command {
        CliCommand::Serve(args) => {
            run_send_sms_server(SendSmsServerConfig {
                orchestrator: Arc::new(orchestrator),
                bind: args.bind,
                request_timeout_ms: args.request_timeout_ms,
            })
            .await
        }
        CliCommand::Send(args) => {
            let report = execute_send_command(&orchestrator, &args).await?;
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("failed to render report")?
                );
            } else {
                println!("{}", render_send_report(&report));
            }
            if !report.all_succeeded() {
                tracing::warn!(
                    failed = report.failed,
                    cancelled = report.cancelled,
                    "some recipients were not delivered"
                );
            }
            Ok(())
        }
    }
}
