//! Shared plumbing for the awsign signing crates.
//!
//! The signing crates never talk to the network directly. Every outbound
//! request (the container credential endpoint, signed object-store calls)
//! goes through the [`HttpTransport`] trait so that callers choose the
//! implementation at construction time: [`ReqwestTransport`] in production,
//! or the in-memory `MockTransport` (behind the `test-util` feature) in tests.
//!
//! # Modules
//!
//! - [`transport`] - Request/response types, the transport trait and its reqwest adapter

pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockTransport;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
