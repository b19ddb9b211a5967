//! Webhook verification errors.

/// Reasons a webhook is rejected.
///
/// Every variant is terminal for the request being verified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// The header is malformed or no provided signature matches.
    #[error("webhook signature is invalid")]
    InvalidSignature,

    /// The signature matched but the body is not a JSON object or array.
    #[error("webhook payload is invalid: {0}")]
    InvalidPayload(String),

    /// The signed timestamp is outside the configured tolerance.
    #[error("webhook timestamp is outside the allowed tolerance")]
    TimestampOutOfTolerance,
}
