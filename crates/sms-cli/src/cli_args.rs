use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use sms_dispatch::{
    DispatchConfig, RecipientFilter, DEFAULT_MAX_ATTACHMENT_BYTES, DEFAULT_MAX_TEXT_CHARS,
    DEFAULT_WORKER_POOL_CAP,
};
use sms_gateway::DEFAULT_GATEWAY_API_BASE;
use sms_server::{DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SEND_SMS_BIND};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "sms-dispatch",
    about = "Bulk SMS/MMS dispatch through an HMAC-signed messaging gateway",
    version
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) gateway: GatewayArgs,

    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Debug, Args)]
pub(crate) struct GatewayArgs {
    #[arg(
        long = "api-base",
        env = "SMS_API_BASE",
        global = true,
        default_value = DEFAULT_GATEWAY_API_BASE,
        help = "Base URL of the messaging gateway"
    )]
    pub(crate) api_base: String,

    #[arg(
        long = "api-key",
        env = "SMS_API_KEY",
        global = true,
        help = "Gateway API key sent in the authorization header"
    )]
    pub(crate) api_key: Option<String>,

    #[arg(
        long = "api-secret",
        env = "SMS_API_SECRET",
        global = true,
        hide_env_values = true,
        help = "Gateway API secret used to sign each dispatch"
    )]
    pub(crate) api_secret: Option<String>,

    #[arg(
        long,
        env = "SMS_SENDER",
        global = true,
        help = "Registered sender number used as the message origin"
    )]
    pub(crate) sender: Option<String>,

    #[arg(
        long = "upload-timeout-ms",
        env = "SMS_UPLOAD_TIMEOUT_MS",
        global = true,
        default_value_t = 15_000,
        value_parser = parse_positive_u64,
        help = "Timeout for the attachment upload call"
    )]
    pub(crate) upload_timeout_ms: u64,

    #[arg(
        long = "send-timeout-ms",
        env = "SMS_SEND_TIMEOUT_MS",
        global = true,
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Timeout for each per-recipient send call"
    )]
    pub(crate) send_timeout_ms: u64,

    #[arg(
        long = "max-in-flight",
        env = "SMS_MAX_IN_FLIGHT",
        global = true,
        value_parser = parse_positive_usize,
        help = "Upper bound on concurrent sends. Defaults to the recipient count capped by --worker-pool-cap"
    )]
    pub(crate) max_in_flight: Option<usize>,

    #[arg(
        long = "worker-pool-cap",
        env = "SMS_WORKER_POOL_CAP",
        global = true,
        default_value_t = DEFAULT_WORKER_POOL_CAP,
        value_parser = parse_positive_usize,
        help = "Concurrency cap applied when --max-in-flight is not set"
    )]
    pub(crate) worker_pool_cap: usize,

    #[arg(
        long = "max-attachment-bytes",
        env = "SMS_MAX_ATTACHMENT_BYTES",
        global = true,
        default_value_t = DEFAULT_MAX_ATTACHMENT_BYTES,
        value_parser = parse_positive_usize,
        help = "Largest accepted image attachment in bytes"
    )]
    pub(crate) max_attachment_bytes: usize,

    #[arg(
        long = "max-text-chars",
        env = "SMS_MAX_TEXT_CHARS",
        global = true,
        default_value_t = DEFAULT_MAX_TEXT_CHARS,
        value_parser = parse_positive_usize,
        help = "Longest accepted message text in characters"
    )]
    pub(crate) max_text_chars: usize,
}

impl GatewayArgs {
    pub(crate) fn to_dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            api_base: self.api_base.clone(),
            api_key: self.api_key.clone().unwrap_or_default(),
            api_secret: self.api_secret.clone().unwrap_or_default(),
            sender: self.sender.clone().unwrap_or_default(),
            upload_timeout_ms: self.upload_timeout_ms,
            send_timeout_ms: self.send_timeout_ms,
            max_in_flight: self.max_in_flight,
            worker_pool_cap: self.worker_pool_cap,
            max_attachment_bytes: self.max_attachment_bytes,
            max_text_chars: self.max_text_chars,
        }
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Serve the multipart `POST /api/send-sms` endpoint.
    Serve(ServeArgs),
    /// Dispatch one message to a recipient list and print the report.
    Send(SendArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ServeArgs {
    #[arg(
        long,
        env = "SMS_BIND",
        default_value = DEFAULT_SEND_SMS_BIND,
        help = "Socket address the HTTP server binds to"
    )]
    pub(crate) bind: String,

    #[arg(
        long = "request-timeout-ms",
        env = "SMS_REQUEST_TIMEOUT_MS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Per-request deadline; sends still outstanding are reported as cancelled"
    )]
    pub(crate) request_timeout_ms: u64,
}

#[derive(Debug, Args)]
pub(crate) struct SendArgs {
    #[arg(long, short = 'm', help = "Message text")]
    pub(crate) message: String,

    #[arg(
        long = "to",
        action = ArgAction::Append,
        value_delimiter = ',',
        help = "Recipient phone number. Repeat or comma-separate for several"
    )]
    pub(crate) to: Vec<String>,

    #[arg(
        long,
        help = "JSON array of customer sale records to select recipients from"
    )]
    pub(crate) records: Option<PathBuf>,

    #[arg(long = "from-date", requires = "records", help = "Earliest sale date (YYYY-MM-DD), inclusive")]
    pub(crate) sale_date_from: Option<NaiveDate>,

    #[arg(long = "to-date", requires = "records", help = "Latest sale date (YYYY-MM-DD), inclusive")]
    pub(crate) sale_date_to: Option<NaiveDate>,

    #[arg(long = "min-amount", requires = "records", help = "Minimum sale amount")]
    pub(crate) min_amount: Option<i64>,

    #[arg(long, requires = "records", help = "Exact customer flag to match")]
    pub(crate) flag: Option<String>,

    #[arg(long = "name", requires = "records", help = "Customer name substring, case-insensitive")]
    pub(crate) name_contains: Option<String>,

    #[arg(long = "phone", requires = "records", help = "Phone number substring")]
    pub(crate) phone_contains: Option<String>,

    #[arg(long, help = "Image attachment (jpeg, png or gif) sent as MMS")]
    pub(crate) image: Option<PathBuf>,

    #[arg(
        long = "timeout-ms",
        value_parser = parse_positive_u64,
        help = "Overall deadline; sends still outstanding are reported as cancelled"
    )]
    pub(crate) timeout_ms: Option<u64>,

    #[arg(long, help = "Print the full report as JSON")]
    pub(crate) json: bool,
}

impl SendArgs {
    pub(crate) fn recipient_filter(&self) -> RecipientFilter {
        RecipientFilter {
            sale_date_from: self.sale_date_from,
            sale_date_to: self.sale_date_to,
            min_amount: self.min_amount,
            flag: self.flag.clone(),
            name_contains: self.name_contains.clone(),
            phone_contains: self.phone_contains.clone(),
        }
    }
}
