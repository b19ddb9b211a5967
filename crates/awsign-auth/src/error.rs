//! Error types for credential resolution.
//!
//! Signing itself is infallible once credentials are in hand, so the only
//! failures this crate reports come from [`crate::credentials`].

/// Errors that can occur while resolving AWS credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// Neither static environment credentials nor a container credentials
    /// endpoint are configured.
    #[error("no AWS credentials found in environment")]
    NoCredentials,

    /// The container credentials endpoint was configured but could not
    /// produce credentials (transport failure, non-200 status or bad body).
    #[error("failed to fetch container credentials: {0}")]
    FetchFailed(String),
}
