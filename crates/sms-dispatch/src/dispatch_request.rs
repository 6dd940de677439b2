//! Validated dispatch input.
//!
//! A `DispatchRequest` is built once at the calling boundary. Empty messages,
//! empty recipient lists, blank recipient entries and oversized attachments are
//! rejected here, before any signing or network activity.

use serde_json::Value;
use sms_gateway::GatewayAttachment;

use crate::dispatch_config::DispatchRequestLimits;
use crate::dispatch_error::{
    DispatchError, VALIDATION_REASON_ATTACHMENT_EMPTY, VALIDATION_REASON_ATTACHMENT_TOO_LARGE,
    VALIDATION_REASON_BLANK_RECIPIENT, VALIDATION_REASON_EMPTY_MESSAGE,
    VALIDATION_REASON_EMPTY_RECIPIENTS, VALIDATION_REASON_MESSAGE_TOO_LONG,
    VALIDATION_REASON_RECEIVERS_MALFORMED,
};

const PHONE_MIN_DIGITS: usize = 8;
const PHONE_MAX_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    raw: String,
    normalized: String,
}

impl Recipient {
    pub fn parse(raw: &str) -> Result<Self, DispatchError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DispatchError::validation(
                VALIDATION_REASON_BLANK_RECIPIENT,
                "recipient entries cannot be blank",
            ));
        }
        Ok(Self {
            raw: trimmed.to_string(),
            normalized: normalize_phone_number(trimmed),
        })
    }

    /// Normalized phone number sent to the gateway.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_well_formed(&self) -> bool {
        (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&self.normalized.len())
            && self.normalized.chars().all(|ch| ch.is_ascii_digit())
    }

    /// Log-safe rendering that keeps only the last four characters.
    pub fn masked(&self) -> String {
        let count = self.normalized.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let suffix: String = self.normalized.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), suffix)
    }
}

pub fn normalize_phone_number(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !matches!(ch, '-' | '(' | ')' | '.') && !ch.is_whitespace())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    message: String,
    recipients: Vec<Recipient>,
    attachment: Option<GatewayAttachment>,
}

impl DispatchRequest {
    pub fn new<I, S>(
        message: &str,
        recipients: I,
        attachment: Option<GatewayAttachment>,
        limits: DispatchRequestLimits,
    ) -> Result<Self, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if message.trim().is_empty() {
            return Err(DispatchError::validation(
                VALIDATION_REASON_EMPTY_MESSAGE,
                "message text cannot be empty",
            ));
        }
        let text_chars = message.chars().count();
        if text_chars > limits.max_text_chars {
            return Err(DispatchError::validation(
                VALIDATION_REASON_MESSAGE_TOO_LONG,
                format!(
                    "message text too long: {} chars exceeds {}",
                    text_chars, limits.max_text_chars
                ),
            ));
        }

        let recipients = recipients
            .into_iter()
            .map(|raw| Recipient::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if recipients.is_empty() {
            return Err(DispatchError::validation(
                VALIDATION_REASON_EMPTY_RECIPIENTS,
                "at least one recipient is required",
            ));
        }

        if let Some(attachment) = attachment.as_ref() {
            if attachment.bytes.is_empty() {
                return Err(DispatchError::validation(
                    VALIDATION_REASON_ATTACHMENT_EMPTY,
                    format!("attachment '{}' is empty", attachment.file_name),
                ));
            }
            if attachment.bytes.len() > limits.max_attachment_bytes {
                return Err(DispatchError::validation(
                    VALIDATION_REASON_ATTACHMENT_TOO_LARGE,
                    format!(
                        "attachment '{}' is {} bytes; limit is {}",
                        attachment.file_name,
                        attachment.bytes.len(),
                        limits.max_attachment_bytes
                    ),
                ));
            }
        }

        Ok(Self {
            message: message.to_string(),
            recipients,
            attachment,
        })
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn attachment(&self) -> Option<&GatewayAttachment> {
        self.attachment.as_ref()
    }
}

/// Parses the `receivers` form field: a JSON array of phone-number strings.
pub fn parse_receivers_field(raw: &str) -> Result<Vec<String>, DispatchError> {
    let parsed = serde_json::from_str::<Value>(raw.trim()).map_err(|error| {
        DispatchError::validation(
            VALIDATION_REASON_RECEIVERS_MALFORMED,
            format!("receivers must be a JSON array of strings: {error}"),
        )
    })?;
    let Value::Array(items) = parsed else {
        return Err(DispatchError::validation(
            VALIDATION_REASON_RECEIVERS_MALFORMED,
            "receivers must be a JSON array of strings",
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(value) => Ok(value),
            other => Err(DispatchError::validation(
                VALIDATION_REASON_RECEIVERS_MALFORMED,
                format!("receivers[{index}] must be a string, found {other}"),
            )),
        })
        .collect()
}
