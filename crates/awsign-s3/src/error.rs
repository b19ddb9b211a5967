//! Error types for object-storage signing and REST calls.

use awsign_auth::CredentialError;
use awsign_core::TransportError;
use http::StatusCode;

/// Errors raised while parsing S3 XML responses.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    /// A required XML element was missing.
    #[error("missing required XML element: {0}")]
    MissingElement(String),

    /// The document ended or nested in a way the parser did not expect.
    #[error("unexpected XML element: {0}")]
    UnexpectedElement(String),

    /// An error parsing a value from XML text content.
    #[error("failed to parse value: {0}")]
    ParseError(String),
}

/// Errors raised by object-storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required configuration value is missing. Raised before any signing.
    #[error("storage is not configured: missing {0}")]
    NotConfigured(&'static str),

    /// The object does not exist.
    #[error("object not found")]
    NotFound,

    /// The service answered with an unexpected status.
    #[error("unexpected response status {status}: {body}")]
    Http {
        /// Response status.
        status: StatusCode,
        /// Response body, decoded lossily.
        body: String,
    },

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Credentials could not be resolved.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// A response body could not be parsed.
    #[error(transparent)]
    Xml(#[from] XmlError),
}
