//! Wire transport seam between [`ApiClient`](super::client::ApiClient) and the network.
//!
//! DESIGN
//! ======
//! `ApiClient` never talks to `reqwest` directly; it hands a fully built
//! [`HttpRequest`] to a [`Transport`] and gets back status + body bytes.
//! Production uses [`ReqwestTransport`]; tests script responses with
//! `test_helpers::MockTransport` and inspect what was sent.
//!
//! ERROR HANDLING
//! ==============
//! A [`TransportError`] means no HTTP response was obtained (connect failure,
//! timeout, truncated body). Any response, whatever its status, is `Ok`.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::HeaderMap;

use crate::config::Timeouts;

/// Errors produced before an HTTP response is available.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connect or send failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The response body could not be read.
    #[error("response body read failed: {0}")]
    Body(String),
}

impl TransportError {
    fn from_send(err: &reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout(err.to_string()) } else { Self::Request(err.to_string()) }
    }
}

/// A request ready to go on the wire.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL without query string.
    pub url: String,
    pub headers: HeaderMap,
    /// Query pairs, encoded by the transport.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
}

/// Raw response: status code plus body bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can execute an [`HttpRequest`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and collect the full response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if no response could be obtained.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// =============================================================================
// REQWEST
// =============================================================================

/// [`Transport`] backed by a pooled `reqwest::Client`.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the given request and connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend fails to initialize.
    pub fn new(timeouts: Timeouts) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method, &request.url)
            .headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_send(&e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(HttpResponse { status, body: body.to_vec() })
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    use super::*;

    /// Scripted transport: replays queued outcomes in order and records every request.
    #[derive(Default)]
    pub struct MockTransport {
        outcomes: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response with a JSON body.
        pub fn push_json(&self, status: u16, body: &serde_json::Value) {
            let bytes = body.to_string().into_bytes();
            self.push(Ok(HttpResponse { status, body: bytes }));
        }

        /// Queue a response with raw body bytes.
        pub fn push_bytes(&self, status: u16, body: &[u8]) {
            self.push(Ok(HttpResponse { status, body: body.to_vec() }));
        }

        /// Queue a transport-level failure.
        pub fn push_error(&self, error: TransportError) {
            self.push(Err(error));
        }

        fn push(&self, outcome: Result<HttpResponse, TransportError>) {
            self.outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(outcome);
        }

        /// Every request executed so far, oldest first.
        #[must_use]
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        #[must_use]
        pub fn request_count(&self) -> usize {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }
    }

    #[async_trait::async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            self.outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Request("no scripted response".to_owned())))
        }
    }
}
