//! Shared REST client: base URL, default headers, global response interception.
//!
//! DESIGN
//! ======
//! One [`ApiClient`] is built at startup and cloned into every caller; clones
//! share the same [`DefaultHeaders`] slot and the same interceptor list, so a
//! header set by the session is stamped on every later request no matter who
//! issues it, and every response is seen by every interceptor.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures are passed through untouched and never reach the
//! interceptors. Any HTTP response is shown to the interceptors first; a
//! non-2xx status then becomes [`ApiError::Status`] for the original caller.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use super::types::MessageBody;

pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Errors returned by [`ApiClient`] calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was obtained.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    /// A 2xx body did not match the expected schema.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The request body could not be serialized.
    #[error("request encode failed: {0}")]
    Encode(String),
}

impl ApiError {
    /// HTTP status, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(STATUS_UNAUTHORIZED)
    }

    /// Human-readable `message` from the server's error payload, if it sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Build the `Bearer <token>` authorization value.
///
/// # Errors
///
/// Returns an error if the token contains bytes not allowed in a header.
pub fn bearer_value(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
    value.set_sensitive(true);
    Ok(value)
}

// =============================================================================
// DEFAULT HEADERS
// =============================================================================

/// Mutable set of headers attached to every outgoing request.
///
/// Cloning yields another handle to the same slot.
#[derive(Clone, Debug, Default)]
pub struct DefaultHeaders {
    inner: Arc<RwLock<HeaderMap>>,
}

impl DefaultHeaders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_authorization(&self, value: HeaderValue) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(AUTHORIZATION, value);
    }

    /// Remove the authorization header entirely (not set to empty).
    pub fn clear_authorization(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(AUTHORIZATION);
    }

    /// Current authorization header as text, if set.
    #[must_use]
    pub fn authorization(&self) -> Option<String> {
        let headers = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let value = headers.get(AUTHORIZATION)?;
        match value.to_str() {
            Ok(text) => Some(text.to_owned()),
            Err(_) => None,
        }
    }

    /// Copy of the current headers for one outgoing request.
    #[must_use]
    pub fn snapshot(&self) -> HeaderMap {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// =============================================================================
// INTERCEPTION
// =============================================================================

/// Observer run on every HTTP response, success or failure, before the caller sees it.
pub trait ResponseInterceptor: Send + Sync {
    fn on_response(&self, status: u16);
}

// =============================================================================
// CLIENT
// =============================================================================

/// REST client bound to one server origin.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    headers: DefaultHeaders,
    interceptors: Arc<RwLock<Vec<Arc<dyn ResponseInterceptor>>>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>, headers: DefaultHeaders) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            headers,
            interceptors: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an interceptor on this client and all of its clones.
    pub fn add_interceptor(&self, interceptor: Arc<dyn ResponseInterceptor>) {
        self.interceptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(interceptor);
    }

    #[must_use]
    pub fn headers(&self) -> &DefaultHeaders {
        &self.headers
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET` a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or schema mismatch.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, Vec::new(), None).await?;
        decode(&response)
    }

    /// `GET` a JSON document with query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or schema mismatch.
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, query, None).await?;
        decode(&response)
    }

    /// `GET` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-2xx status.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.send(Method::GET, path, Vec::new(), None).await?;
        Ok(response.body)
    }

    /// `POST` a JSON body and decode a JSON reply.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or schema mismatch.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = encode(body)?;
        let response = self.send(Method::POST, path, Vec::new(), Some(body)).await?;
        decode(&response)
    }

    /// `DELETE` a resource, ignoring any reply body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-2xx status.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, Vec::new(), None).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse, ApiError> {
        let request = HttpRequest { method, url: self.url(path), headers: self.headers.snapshot(), query, body };
        tracing::debug!(method = %request.method, url = %request.url, "api request");

        let response = self.transport.execute(request).await?;
        self.intercept(response.status);

        if !response.is_success() {
            tracing::debug!(status = response.status, %path, "api request failed");
            return Err(ApiError::Status { status: response.status, message: error_message(&response.body) });
        }
        Ok(response)
    }

    fn intercept(&self, status: u16) {
        // Snapshot so interceptors can touch the client without deadlocking.
        let interceptors: Vec<Arc<dyn ResponseInterceptor>> = self
            .interceptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for interceptor in interceptors {
            interceptor.on_response(status);
        }
    }
}

fn encode<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull a non-empty `message` out of an error payload.
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<MessageBody>(body) {
        Ok(MessageBody { message: Some(message) }) if !message.trim().is_empty() => Some(message),
        _ => None,
    }
}
