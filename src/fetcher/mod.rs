//! Request capability
//!
//! The loader never talks to the network directly. It goes through a
//! [`RequestCapability`]: "issue an authenticated GET and return status + body".
//! [`wb_http::WbHttpClient`] is the reqwest-backed implementation; tests plug in
//! in-memory implementations.

use async_trait::async_trait;
use std::time::Duration;

pub mod failure;
pub mod wb_http;

pub use failure::{FailureCategory, FailureKind};

/// Transport-level failure: no HTTP response was obtained
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request did not complete within its timeout
    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other transport failure
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Classify a reqwest error raised while honoring `timeout`
    pub fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// One authenticated GET request
#[derive(Debug, Clone, Copy)]
pub struct ApiRequest<'a> {
    /// Fully resolved endpoint URL
    pub url: &'a str,
    /// Query parameters, in order
    pub query: &'a [(String, String)],
    /// Bearer token
    pub auth_token: &'a str,
    /// Upper bound for the whole request
    pub timeout: Duration,
}

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl ApiResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in 200..=299
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to perform authenticated GET requests.
///
/// Implementations must attach `Authorization: Bearer <token>` and
/// `Content-Type: application/json`, and must honor `request.timeout`.
#[async_trait]
pub trait RequestCapability: Send + Sync {
    /// Perform the request
    async fn get(&self, request: ApiRequest<'_>) -> Result<ApiResponse, TransportError>;
}
