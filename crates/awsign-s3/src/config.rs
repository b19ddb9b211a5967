//! Object-storage configuration.
//!
//! Provides [`StorageConfig`], loaded from environment variables by
//! [`StorageConfig::from_env`] or assembled with its typed builder, and
//! [`BucketEndpoint`], the resolved host and path layout of the bucket.

use awsign_auth::canonical::{encode_path, uri_encode};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::StorageError;

/// Default upload size cap: 10 MiB.
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
/// Default presigned download validity.
const DEFAULT_URL_EXPIRY_SECS: u32 = 3600;
/// Default presigned upload policy validity.
const DEFAULT_UPLOAD_TTL_SECS: u32 = 900;
/// Default server-side encryption algorithm.
const DEFAULT_SERVER_SIDE_ENCRYPTION: &str = "AES256";

/// Object-storage configuration.
///
/// `region` and `bucket` have no default; operations fail with
/// [`StorageError::NotConfigured`] while either is empty.
///
/// # Examples
///
/// ```
/// use awsign_s3::config::StorageConfig;
///
/// let config = StorageConfig::builder()
///     .region("us-east-1".into())
///     .bucket("uploads".into())
///     .build();
/// assert_eq!(config.url_expiry_secs, 3600);
/// assert_eq!(config.server_side_encryption, "AES256");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Region the bucket lives in.
    #[builder(default)]
    pub region: String,

    /// Bucket name.
    #[builder(default)]
    pub bucket: String,

    /// Upper bound of `content-length-range` in presigned POST policies.
    #[builder(default = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    /// Validity of presigned download URLs, in seconds.
    #[builder(default = DEFAULT_URL_EXPIRY_SECS)]
    pub url_expiry_secs: u32,

    /// Validity of presigned POST policies, in seconds.
    #[builder(default = DEFAULT_UPLOAD_TTL_SECS)]
    pub upload_ttl_secs: u32,

    /// Value of `x-amz-server-side-encryption` required on uploads.
    #[builder(default = String::from(DEFAULT_SERVER_SIDE_ENCRYPTION))]
    pub server_side_encryption: String,

    /// Base URL of an S3-compatible store (e.g. `http://localhost:4566`).
    /// When set, requests use path-style addressing against it.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            bucket: String::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            url_expiry_secs: DEFAULT_URL_EXPIRY_SECS,
            upload_ttl_secs: DEFAULT_UPLOAD_TTL_SECS,
            server_side_encryption: String::from(DEFAULT_SERVER_SIDE_ENCRYPTION),
            endpoint: None,
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `AWS_REGION` (then `AWS_DEFAULT_REGION`) | none |
    /// | `S3_BUCKET` | none |
    /// | `S3_MAX_UPLOAD_BYTES` | `10485760` |
    /// | `S3_URL_EXPIRY_SECS` | `3600` |
    /// | `S3_UPLOAD_TTL_SECS` | `900` |
    /// | `S3_SERVER_SIDE_ENCRYPTION` | `AES256` |
    /// | `S3_ENDPOINT` | none |
    ///
    /// Empty and unparsable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, using the variables of
    /// [`StorageConfig::from_env`].
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = var("AWS_REGION").or_else(|| var("AWS_DEFAULT_REGION")) {
            config.region = v;
        }
        if let Some(v) = var("S3_BUCKET") {
            config.bucket = v;
        }
        if let Some(n) = var("S3_MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
            config.max_upload_bytes = n;
        }
        if let Some(n) = var("S3_URL_EXPIRY_SECS").and_then(|v| v.parse().ok()) {
            config.url_expiry_secs = n;
        }
        if let Some(n) = var("S3_UPLOAD_TTL_SECS").and_then(|v| v.parse().ok()) {
            config.upload_ttl_secs = n;
        }
        if let Some(v) = var("S3_SERVER_SIDE_ENCRYPTION") {
            config.server_side_encryption = v;
        }
        config.endpoint = var("S3_ENDPOINT");

        config
    }

    /// The configured region, or [`StorageError::NotConfigured`].
    pub fn require_region(&self) -> Result<&str, StorageError> {
        if self.region.is_empty() {
            return Err(StorageError::NotConfigured("region"));
        }
        Ok(&self.region)
    }

    /// Resolve where the bucket is reached.
    ///
    /// Without an endpoint override this is the virtual-hosted AWS host
    /// `<bucket>.s3.<region>.amazonaws.com` over HTTPS.
    pub fn bucket_endpoint(&self) -> Result<BucketEndpoint, StorageError> {
        if self.bucket.is_empty() {
            return Err(StorageError::NotConfigured("bucket"));
        }
        let region = self.require_region()?;

        let Some(endpoint) = self.endpoint.as_deref() else {
            return Ok(BucketEndpoint {
                scheme: "https".to_owned(),
                host: format!("{}.s3.{region}.amazonaws.com", self.bucket),
                base_path: String::new(),
            });
        };

        let (scheme, rest) = endpoint.split_once("://").unwrap_or(("https", endpoint));
        let host = rest.split('/').next().unwrap_or(rest);
        Ok(BucketEndpoint {
            scheme: scheme.to_owned(),
            host: host.to_owned(),
            base_path: format!("/{}", uri_encode(&self.bucket)),
        })
    }
}

/// Scheme, host and path prefix under which a bucket's objects are addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEndpoint {
    scheme: String,
    host: String,
    base_path: String,
}

impl BucketEndpoint {
    /// Value of the signed `host` header.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// URL of the bucket itself, without a trailing slash.
    #[must_use]
    pub fn bucket_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.base_path)
    }

    /// Canonical path of the bucket root.
    #[must_use]
    pub fn bucket_path(&self) -> String {
        if self.base_path.is_empty() {
            "/".to_owned()
        } else {
            self.base_path.clone()
        }
    }

    /// Canonical (encoded) path of `key`.
    #[must_use]
    pub fn object_path(&self, key: &str) -> String {
        format!("{}{}", self.base_path, encode_path(key))
    }

    /// Absolute URL for an already-encoded `path` and query string.
    #[must_use]
    pub fn url(&self, path: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}://{}{path}", self.scheme, self.host)
        } else {
            format!("{}://{}{path}?{query}", self.scheme, self.host)
        }
    }
}
