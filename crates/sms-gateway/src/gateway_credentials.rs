//! HMAC request signing for the messaging gateway.
//!
//! Every dispatch derives one credential triplet (timestamp, nonce, signature)
//! from the configured secret. The triplet is rendered into the gateway's
//! `Authorization` header and shared by all calls made for that dispatch.

use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

pub const GATEWAY_AUTH_SCHEME: &str = "HMAC-SHA256";
pub const GATEWAY_NONCE_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayCredentialError {
    #[error("gateway api key is not configured")]
    MissingApiKey,
    #[error("gateway api secret is not configured")]
    MissingApiSecret,
    #[error("failed to initialize gateway signer: {0}")]
    SignerInit(String),
}

/// Process-wide signing material. Built once from configuration and shared
/// read-only across dispatches.
#[derive(Clone)]
pub struct GatewaySigningKey {
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for GatewaySigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySigningKey")
            .field("api_key", &self.api_key)
            .field("api_secret", &"(redacted)")
            .finish()
    }
}

impl GatewaySigningKey {
    pub fn new(api_key: &str, api_secret: &str) -> Result<Self, GatewayCredentialError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(GatewayCredentialError::MissingApiKey);
        }
        let api_secret = api_secret.trim();
        if api_secret.is_empty() {
            return Err(GatewayCredentialError::MissingApiSecret);
        }
        Ok(Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Signs with the current wall clock and a fresh nonce.
    pub fn sign_now(&self) -> Result<GatewayCredential, GatewayCredentialError> {
        self.sign_at(Utc::now(), &generate_gateway_nonce())
    }

    pub fn sign_at(
        &self,
        now: DateTime<Utc>,
        nonce: &str,
    ) -> Result<GatewayCredential, GatewayCredentialError> {
        let timestamp = format_gateway_timestamp(now);
        let signature = compute_gateway_signature(&self.api_secret, &timestamp, nonce)?;
        Ok(GatewayCredential {
            api_key: self.api_key.clone(),
            timestamp,
            nonce: nonce.to_string(),
            signature,
        })
    }
}

/// Signed authorization metadata attached to every gateway call of one dispatch.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayCredential {
    api_key: String,
    timestamp: String,
    nonce: String,
    signature: String,
}

impl std::fmt::Debug for GatewayCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredential")
            .field("api_key", &self.api_key)
            .field("timestamp", &self.timestamp)
            .field("nonce", &self.nonce)
            .field("signature", &"(redacted)")
            .finish()
    }
}

impl GatewayCredential {
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn authorization_header(&self) -> String {
        format!(
            "{} apiKey={}, date={}, salt={}, signature={}",
            GATEWAY_AUTH_SCHEME, self.api_key, self.timestamp, self.nonce, self.signature
        )
    }
}

pub fn format_gateway_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn compute_gateway_signature(
    secret: &str,
    timestamp: &str,
    nonce: &str,
) -> Result<String, GatewayCredentialError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|error| GatewayCredentialError::SignerInit(error.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(nonce.as_bytes());
    Ok(encode_hex(&mac.finalize().into_bytes()))
}

pub fn generate_gateway_nonce() -> String {
    let mut bytes = [0u8; GATEWAY_NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    encode_hex(&bytes)
}

fn encode_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        encoded.push(HEX[(byte >> 4) as usize] as char);
        encoded.push(HEX[(byte & 0x0F) as usize] as char);
    }
    encoded
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53)
            .single()
            .expect("fixed timestamp")
    }

    #[test]
    fn unit_signing_key_rejects_blank_secret() {
        let error = GatewaySigningKey::new("key", "  ").expect_err("blank secret");
        assert_eq!(error, GatewayCredentialError::MissingApiSecret);
        let error = GatewaySigningKey::new("", "secret").expect_err("blank key");
        assert_eq!(error, GatewayCredentialError::MissingApiKey);
    }

    #[test]
    fn unit_signature_matches_reference_hmac_vector() {
        // RFC 4231 test case 2: key "Jefe", data "what do ya want for nothing?".
        let signature =
            compute_gateway_signature("Jefe", "what do ya want ", "for nothing?").expect("sign");
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn unit_signature_is_deterministic_for_fixed_inputs() {
        let key = GatewaySigningKey::new("key-1", "secret-1").expect("key");
        let first = key.sign_at(fixed_now(), "abc123").expect("first");
        let second = key.sign_at(fixed_now(), "abc123").expect("second");
        assert_eq!(first, second);
        assert_eq!(first.timestamp(), "2025-03-14T09:26:53.000Z");
        assert_eq!(first.signature().len(), 64);
    }

    #[test]
    fn unit_signature_changes_when_any_input_changes() {
        let base = compute_gateway_signature("secret", "2025-03-14T09:26:53.000Z", "aa")
            .expect("base");
        let other_secret = compute_gateway_signature("secret2", "2025-03-14T09:26:53.000Z", "aa")
            .expect("secret");
        let other_time = compute_gateway_signature("secret", "2025-03-14T09:26:54.000Z", "aa")
            .expect("time");
        let other_nonce = compute_gateway_signature("secret", "2025-03-14T09:26:53.000Z", "ab")
            .expect("nonce");
        assert_ne!(base, other_secret);
        assert_ne!(base, other_time);
        assert_ne!(base, other_nonce);
    }

    #[test]
    fn unit_nonce_is_256_bit_hex_and_not_repeated() {
        let first = generate_gateway_nonce();
        let second = generate_gateway_nonce();
        assert_eq!(first.len(), GATEWAY_NONCE_BYTES * 2);
        assert!(first.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn unit_authorization_header_renders_all_fields() {
        let key = GatewaySigningKey::new("NCS123", "secret").expect("key");
        let credential = key.sign_at(fixed_now(), "00ff").expect("credential");
        let header = credential.authorization_header();
        assert!(header.starts_with("HMAC-SHA256 apiKey=NCS123, date=2025-03-14T09:26:53.000Z"));
        assert!(header.contains("salt=00ff"));
        assert!(header.ends_with(&format!("signature={}", credential.signature())));
    }

    #[test]
    fn regression_debug_output_redacts_secret_material() {
        let key = GatewaySigningKey::new("NCS123", "top-secret").expect("key");
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("top-secret"));
        let credential = key.sign_at(fixed_now(), "00ff").expect("credential");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains(credential.signature()));
    }
}
