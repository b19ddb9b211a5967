//! In-memory [`HttpTransport`] for tests.
//!
//! Responses are queued up front and handed out in order; every request is
//! recorded so tests can assert on exactly what was sent.

use std::collections::VecDeque;

use async_trait::async_trait;
use http::StatusCode;
use parking_lot::Mutex;

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// A scripted transport that replays queued responses.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Create a transport with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body.
    #[must_use]
    pub fn respond(self, status: u16, body: impl Into<bytes::Bytes>) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.responses
            .lock()
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    /// Queue a fully built response.
    #[must_use]
    pub fn respond_with(self, response: HttpResponse) -> Self {
        self.responses.lock().push_back(Ok(response));
        self
    }

    /// Queue a transport failure.
    #[must_use]
    pub fn fail(self, error: TransportError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// All requests sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no response queued".to_owned())))
    }
}
