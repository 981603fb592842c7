//! reqwest-backed request capability for the Wildberries API
//!
//! Attaches the bearer token and JSON content type to every request, honors the
//! per-request timeout, and optionally retries transient failures (transport
//! errors, 429, 5xx) with exponential backoff. Retries are off by default.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ApiRequest, ApiResponse, FailureKind, RequestCapability, TransportError};
use crate::loader::config::calculate_backoff;
use crate::metrics::HttpRequestMetrics;

/// HTTP connect timeout - time to establish the TCP connection
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent sent with every request
const USER_AGENT: &str = concat!("wb-report-loader/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the statistics API
#[derive(Debug, Clone)]
pub struct WbHttpClient {
    client: Client,
    max_retries: u32,
}

impl WbHttpClient {
    /// Build a client with default connection settings
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_retries: 0,
        }
    }

    /// Set how many times a transient failure is retried
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Configured retry count
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    async fn send_once(
        &self,
        request: &ApiRequest<'_>,
        attempt: u32,
    ) -> Result<ApiResponse, TransportError> {
        let metrics = HttpRequestMetrics::start(request.url, attempt);

        let sent = self
            .client
            .get(request.url)
            .query(request.query)
            .bearer_auth(request.auth_token)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .timeout(request.timeout)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                metrics.record_transport_error();
                return Err(TransportError::from_reqwest(&e, request.timeout));
            }
        };

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            metrics.record_transport_error();
            TransportError::from_reqwest(&e, request.timeout)
        })?;

        metrics.record_complete(status);
        Ok(ApiResponse::new(status, body))
    }
}

#[async_trait]
impl RequestCapability for WbHttpClient {
    async fn get(&self, request: ApiRequest<'_>) -> Result<ApiResponse, TransportError> {
        let mut attempt = 0;

        loop {
            let result = self.send_once(&request, attempt + 1).await;

            let kind = match &result {
                Ok(response) if response.is_success() => return result,
                Ok(response) => FailureKind::from_status(response.status),
                Err(e) => FailureKind::from_transport(e),
            };

            if !kind.is_retryable() || attempt >= self.max_retries {
                return result;
            }

            let backoff = calculate_backoff(attempt);
            warn!(
                url = %request.url,
                attempt = attempt + 1,
                max_attempts = self.max_retries + 1,
                reason = %kind,
                backoff_ms = backoff.as_millis() as u64,
                "Retrying request after backoff"
            );
            crate::metrics::record_retry_backoff(backoff, attempt + 1);
            tokio::time::sleep(backoff).await;
            attempt += 1;
            debug!(url = %request.url, attempt = attempt + 1, "Retry attempt starting");
        }
    }
}
