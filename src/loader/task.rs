//! A single report fetch
//!
//! [`FetchTask`] issues one authenticated request and classifies whatever
//! happens into exactly one [`FetchOutcome`]. It never returns an error.

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

use crate::config::ApiToken;
use crate::fetcher::{ApiRequest, ApiResponse, FailureKind, RequestCapability, TransportError};
use crate::loader::config::MAX_ERROR_BODY_CHARS;
use crate::metrics::ReportMetrics;
use crate::registry::EndpointDefinition;
use crate::report::FetchOutcome;
use crate::{DateRange, Record};

/// Everything needed to fetch one report, owned so it can move into a spawned task
#[derive(Debug, Clone)]
pub struct FetchTask {
    key: String,
    display_name: String,
    url: String,
    query: Vec<(String, String)>,
    token: ApiToken,
    timeout: Duration,
}

impl FetchTask {
    /// Resolve the endpoint URL and query for `range`
    pub fn new(
        endpoint: &EndpointDefinition,
        base_url: &str,
        range: &DateRange,
        token: ApiToken,
        timeout: Duration,
    ) -> Self {
        Self {
            key: endpoint.key().to_string(),
            display_name: endpoint.display_name().to_string(),
            url: endpoint.url(base_url),
            query: endpoint.build_query(range),
            token,
            timeout,
        }
    }

    /// Report key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human-readable report name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Resolved URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query parameters in send order
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Perform the request and classify the result
    pub async fn run(&self, capability: &dyn RequestCapability) -> FetchOutcome {
        let span = tracing::info_span!("fetch_report", report = %self.key);
        self.run_inner(capability).instrument(span).await
    }

    async fn run_inner(&self, capability: &dyn RequestCapability) -> FetchOutcome {
        let metrics = ReportMetrics::start(&self.key);
        debug!(url = %self.url, params = ?self.query, "Requesting report");

        let request = ApiRequest {
            url: &self.url,
            query: &self.query,
            auth_token: self.token.as_str(),
            timeout: self.timeout,
        };

        let result = match tokio::time::timeout(self.timeout, capability.get(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        };

        let outcome = match result {
            Ok(response) => self.classify_response(response),
            Err(e) => self.failure(FailureKind::from_transport(&e), e.to_string()),
        };

        match outcome.failure_kind() {
            None => {
                metrics.record_success(outcome.record_count());
                info!(records = outcome.record_count(), "Report loaded");
            }
            Some(kind) => {
                metrics.record_failure();
                warn!(
                    kind = %kind,
                    error = outcome.error_message().unwrap_or_default(),
                    "Report failed"
                );
            }
        }

        outcome
    }

    fn classify_response(&self, response: ApiResponse) -> FetchOutcome {
        if !response.is_success() {
            let kind = FailureKind::from_status(response.status);
            let message = format!(
                "HTTP {} ({}): {}",
                response.status,
                kind.description(),
                truncate_chars(response.body.trim(), MAX_ERROR_BODY_CHARS)
            );
            return self.failure(kind, message);
        }

        match parse_records(&response.body) {
            Ok(records) => FetchOutcome::success(&self.key, &self.display_name, records),
            Err(detail) => self.failure(
                FailureKind::ParseFailure,
                format!("unexpected response format: {detail}"),
            ),
        }
    }

    fn failure(&self, kind: FailureKind, message: String) -> FetchOutcome {
        FetchOutcome::failure(&self.key, &self.display_name, kind, message)
    }
}

/// Interpret a 2xx body as a record sequence.
///
/// An array yields its elements, an object is a single record, `null` or a
/// blank body yields nothing.
pub fn parse_records(body: &str) -> Result<Vec<Record>, String> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {e}"))?;
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(_) => Ok(vec![value]),
        Value::Null => Ok(Vec::new()),
        other => Err(format!("expected a JSON array, got {}", json_type_name(&other))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Cut `text` to at most `max` characters on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
