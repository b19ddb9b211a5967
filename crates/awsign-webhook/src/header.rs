//! Signature header parsing.
//!
//! Two encodings are accepted:
//!
//! - simple: the bare lowercase hex HMAC of the payload,
//! - composite: comma-separated `key=value` pairs carrying one `t=<unix seconds>`
//!   and one or more `v1=<hex>` entries.

use crate::error::VerifyError;

/// A parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// The `t` value of a composite header. `None` for a simple header.
    pub timestamp: Option<String>,
    /// Candidate signatures, in header order.
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parse a header value.
    ///
    /// A value without `=` is a simple header. In a composite header, keys
    /// other than `t` and `v1` are ignored, and a repeated `t` keeps the last
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidSignature`] for an empty header, a
    /// composite header lacking `t` or `v1`, or a pair without `=`.
    ///
    /// # Examples
    ///
    /// ```
    /// use awsign_webhook::SignatureHeader;
    ///
    /// let header = SignatureHeader::parse("t=1700000000,v1=abc,v1=def").unwrap();
    /// assert_eq!(header.timestamp.as_deref(), Some("1700000000"));
    /// assert_eq!(header.signatures, ["abc", "def"]);
    /// ```
    pub fn parse(value: &str) -> Result<Self, VerifyError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(VerifyError::InvalidSignature);
        }

        if !value.contains('=') {
            return Ok(Self {
                timestamp: None,
                signatures: vec![value.to_owned()],
            });
        }

        let mut timestamp = None;
        let mut signatures = Vec::new();
        for pair in value.split(',') {
            let (key, val) = pair
                .trim()
                .split_once('=')
                .ok_or(VerifyError::InvalidSignature)?;
            match key.trim() {
                "t" => timestamp = Some(val.trim().to_owned()),
                "v1" => signatures.push(val.trim().to_owned()),
                _ => {}
            }
        }

        if timestamp.is_none() || signatures.is_empty() {
            return Err(VerifyError::InvalidSignature);
        }
        Ok(Self {
            timestamp,
            signatures,
        })
    }
}
