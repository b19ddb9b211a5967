//! Inbound webhook signature verification.
//!
//! Webhook senders sign each delivery with HMAC-SHA256 under a shared
//! secret. [`verify`] recomputes that HMAC, compares it against the
//! `signature_header` in constant time and, only once the signature is
//! accepted, decodes the body as JSON.
//!
//! [`WebhookVerifier`] binds a secret and can additionally reject composite
//! headers whose timestamp is too far from the current time.
//!
//! ```
//! use std::time::Duration;
//!
//! use awsign_webhook::{WebhookVerifier, sign};
//!
//! let verifier = WebhookVerifier::new("s3cr3t").with_tolerance(Duration::from_secs(300));
//! let now = chrono::Utc::now().timestamp();
//! let header = sign(br#"{"id":"evt_1"}"#, "s3cr3t", Some(now));
//! assert!(verifier.verify(br#"{"id":"evt_1"}"#, &header).is_ok());
//! ```

pub mod error;
pub mod header;
pub mod verify;

pub use error::VerifyError;
pub use header::SignatureHeader;
pub use verify::{WebhookVerifier, sign, verify};
