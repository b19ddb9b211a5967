//! AWS Signature Version 4 signing primitives.
//!
//! The signing flow is:
//!
//! 1. Build a [`CanonicalRequest`](crate::canonical::CanonicalRequest).
//! 2. Hash it and build the string to sign from the timestamp and credential scope.
//! 3. Derive the signing key with the four-step HMAC-SHA256 chain.
//! 4. HMAC the string to sign with the signing key and hex-encode the result.
//!
//! [`SigningContext`] carries the time, region and service that every step
//! needs, so each consumer only decides what goes into the canonical request.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::CanonicalRequest;

/// The only signing algorithm this crate produces.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash placeholder for requests whose body is not signed.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Lowercase hex SHA-256 of the empty string.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Terminator of every credential scope.
const SCOPE_TERMINATOR: &str = "aws4_request";

type HmacSha256 = Hmac<Sha256>;

/// The AWS services this crate signs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// RDS / RDS Proxy IAM database authentication.
    RdsDb,
    /// ElastiCache IAM authentication.
    ElastiCache,
    /// S3 object storage.
    S3,
}

impl Service {
    /// The service name used in the credential scope.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RdsDb => "rds-db",
            Self::ElastiCache => "elasticache",
            Self::S3 => "s3",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time, region and service of a single signing operation.
///
/// # Examples
///
/// ```
/// use awsign_auth::sigv4::{Service, SigningContext};
/// use chrono::{TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap();
/// let ctx = SigningContext::new(now, "us-east-1", Service::S3);
/// assert_eq!(ctx.amz_datetime(), "20130524T000000Z");
/// assert_eq!(ctx.credential_scope(), "20130524/us-east-1/s3/aws4_request");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    timestamp: DateTime<Utc>,
    date_stamp: String,
    amz_datetime: String,
    region: String,
    service: Service,
}

impl SigningContext {
    /// Create a context for `timestamp` in `region` for `service`.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, region: impl Into<String>, service: Service) -> Self {
        Self {
            timestamp,
            date_stamp: timestamp.format("%Y%m%d").to_string(),
            amz_datetime: timestamp.format("%Y%m%dT%H%M%SZ").to_string(),
            region: region.into(),
            service,
        }
    }

    /// The instant being signed.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// `YYYYMMDD`.
    #[must_use]
    pub fn date_stamp(&self) -> &str {
        &self.date_stamp
    }

    /// `YYYYMMDDTHHMMSSZ`.
    #[must_use]
    pub fn amz_datetime(&self) -> &str {
        &self.amz_datetime
    }

    /// Signing region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Signing service.
    #[must_use]
    pub fn service(&self) -> Service {
        self.service
    }

    /// `date/region/service/aws4_request`.
    #[must_use]
    pub fn credential_scope(&self) -> String {
        format!(
            "{}/{}/{}/{SCOPE_TERMINATOR}",
            self.date_stamp, self.region, self.service
        )
    }

    /// `access_key_id/credential_scope`, the value of `X-Amz-Credential`.
    #[must_use]
    pub fn credential(&self, access_key_id: &str) -> String {
        format!("{access_key_id}/{}", self.credential_scope())
    }

    /// Derive the signing key for this context.
    #[must_use]
    pub fn signing_key(&self, secret_access_key: &str) -> Vec<u8> {
        derive_signing_key(
            secret_access_key,
            &self.date_stamp,
            &self.region,
            self.service.as_str(),
        )
    }

    /// Sign a canonical request and return the 64-character hex signature.
    #[must_use]
    pub fn sign(&self, secret_access_key: &str, request: &CanonicalRequest) -> String {
        let canonical_request = request.to_string();
        debug!(canonical_request, "built canonical request");

        let canonical_hash = hash_payload(canonical_request.as_bytes());
        let scope = self.credential_scope();
        let string_to_sign = build_string_to_sign(&self.amz_datetime, &scope, &canonical_hash);
        self.sign_string(secret_access_key, &string_to_sign)
    }

    /// Sign an already-assembled string to sign.
    ///
    /// Presigned POST policies use this directly: the base64 policy is the
    /// string to sign.
    #[must_use]
    pub fn sign_string(&self, secret_access_key: &str, string_to_sign: &str) -> String {
        debug!(string_to_sign, "built string to sign");
        compute_signature(&self.signing_key(secret_access_key), string_to_sign)
    }
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <amz_datetime>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use awsign_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    amz_datetime: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{amz_datetime}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// HMAC `data` with `signing_key` and return the lowercase hex digest.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Compute HMAC-SHA256 and return the raw bytes.
#[must_use]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Lowercase hex SHA-256 of `payload`.
///
/// # Examples
///
/// ```
/// use awsign_auth::sigv4::{EMPTY_PAYLOAD_SHA256, hash_payload};
///
/// assert_eq!(hash_payload(b""), EMPTY_PAYLOAD_SHA256);
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
