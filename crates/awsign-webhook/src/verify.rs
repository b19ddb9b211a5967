//! HMAC-SHA256 webhook verification.
//!
//! The expected signature is recomputed over the payload (simple header) or
//! over `"<t>.<payload>"` (composite header) and compared against each
//! provided signature in constant time.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};
use tracing::{debug, warn};

use crate::error::VerifyError;
use crate::header::SignatureHeader;

type HmacSha256 = Hmac<Sha256>;

/// Verify `payload` against `signature_header` and decode it.
///
/// When a composite header carries several `v1` signatures (as during secret
/// rotation), the webhook is accepted if any of them matches. Every candidate
/// is compared; no comparison is skipped once a match is found.
///
/// The payload is decoded only after the signature has been accepted, and
/// must be a JSON object or array.
///
/// # Errors
///
/// [`VerifyError::InvalidSignature`] if the header is malformed or no
/// signature matches, [`VerifyError::InvalidPayload`] if the signature
/// matches but the payload is not a JSON object or array.
///
/// # Examples
///
/// ```
/// use awsign_webhook::{sign, verify};
///
/// let payload = br#"{"id":"evt_1"}"#;
/// let header = sign(payload, "s3cr3t", Some(1_700_000_000));
/// let event = verify(payload, &header, "s3cr3t").unwrap();
/// assert_eq!(event["id"], "evt_1");
/// ```
pub fn verify(payload: &[u8], signature_header: &str, secret: &str) -> Result<Value, VerifyError> {
    let header = SignatureHeader::parse(signature_header)?;
    check_signature(payload, &header, secret)?;
    decode_payload(payload)
}

/// Sign `payload` the way a webhook sender would.
///
/// Without a timestamp the result is a simple header (bare hex). With one it
/// is a composite `t=<timestamp>,v1=<hex>` header.
#[must_use]
pub fn sign(payload: &[u8], secret: &str, timestamp: Option<i64>) -> String {
    match timestamp {
        None => compute_signature(secret, None, payload),
        Some(t) => {
            let t = t.to_string();
            let signature = compute_signature(secret, Some(&t), payload);
            format!("t={t},v1={signature}")
        }
    }
}

/// A verifier bound to one secret, optionally enforcing timestamp freshness.
///
/// The tolerance applies to composite headers only; simple headers carry no
/// timestamp.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance: Option<Duration>,
}

impl fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"<REDACTED>")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

impl WebhookVerifier {
    /// A verifier without timestamp checks.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: None,
        }
    }

    /// Reject composite headers whose `t` is more than `tolerance` away from now.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// The configured tolerance.
    #[must_use]
    pub fn tolerance(&self) -> Option<Duration> {
        self.tolerance
    }

    /// Verify against the current time. See [`verify`].
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<Value, VerifyError> {
        self.verify_at(payload, signature_header, Utc::now())
    }

    /// Verify as if the current time were `now`.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<Value, VerifyError> {
        let header = SignatureHeader::parse(signature_header)?;
        check_signature(payload, &header, &self.secret)?;

        if let (Some(tolerance), Some(timestamp)) = (self.tolerance, header.timestamp.as_deref()) {
            check_timestamp(timestamp, tolerance, now)?;
        }

        decode_payload(payload)
    }
}

fn compute_signature(secret: &str, timestamp: Option<&str>, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can accept keys of any length");
    if let Some(t) = timestamp {
        mac.update(t.as_bytes());
        mac.update(b".");
    }
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn check_signature(
    payload: &[u8],
    header: &SignatureHeader,
    secret: &str,
) -> Result<(), VerifyError> {
    let expected = compute_signature(secret, header.timestamp.as_deref(), payload);

    let matched = header
        .signatures
        .iter()
        .fold(Choice::from(0), |acc, candidate| {
            acc | expected.as_bytes().ct_eq(candidate.as_bytes())
        });

    if bool::from(matched) {
        debug!(candidates = header.signatures.len(), "webhook signature verified");
        Ok(())
    } else {
        warn!(candidates = header.signatures.len(), "webhook signature mismatch");
        Err(VerifyError::InvalidSignature)
    }
}

fn check_timestamp(
    timestamp: &str,
    tolerance: Duration,
    now: DateTime<Utc>,
) -> Result<(), VerifyError> {
    let signed_at = timestamp
        .parse::<i64>()
        .map_err(|_| VerifyError::InvalidSignature)?;
    let skew = now.timestamp().abs_diff(signed_at);
    if skew > tolerance.as_secs() {
        warn!(skew, tolerance = tolerance.as_secs(), "webhook timestamp outside tolerance");
        return Err(VerifyError::TimestampOutOfTolerance);
    }
    Ok(())
}

fn decode_payload(payload: &[u8]) -> Result<Value, VerifyError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| VerifyError::InvalidPayload(e.to_string()))?;
    if value.is_object() || value.is_array() {
        Ok(value)
    } else {
        Err(VerifyError::InvalidPayload(
            "expected a JSON object or array".to_owned(),
        ))
    }
}
