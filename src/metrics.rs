//! Observability metrics for report loading
//!
//! Tracks HTTP request outcomes and latency, retry backoff, time spent waiting
//! at the concurrency gate, and per-report results.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate for low-overhead metric collection
//! - Prometheus exporter is optional (`--metrics-addr`); without it the macros are no-ops

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: a second call is a no-op.
pub async fn init_metrics(
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the statistics API"
    );

    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );

    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retry attempts"
    );

    describe_counter!(
        "reports_loaded_total",
        Unit::Count,
        "Reports loaded, labelled by report key and status"
    );

    describe_counter!(
        "report_records_total",
        Unit::Count,
        "Records received per report"
    );

    describe_histogram!(
        "concurrency_gate_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for a concurrency slot"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of a single HTTP request
pub struct HttpRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start recording a request
    pub fn start(endpoint: impl Into<String>, attempt: u32) -> Self {
        let endpoint = endpoint.into();
        let correlation_id = generate_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            endpoint = %endpoint,
            attempt = attempt,
            "Starting HTTP request"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record completion with an HTTP status
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => status_code.to_string(),
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        if status_code == 429 {
            warn!(
                correlation_id = %self.correlation_id,
                endpoint = %self.endpoint,
                attempt = self.attempt,
                duration_ms = duration.as_millis() as u64,
                "Rate limit error (429) recorded"
            );
        }

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record a transport failure (no status code)
    pub fn record_transport_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => "transport_error",
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "Transport error recorded"
        );
    }

    /// Correlation ID for this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record retry backoff duration
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!(
        "http_retries_total",
        "attempt" => attempt.to_string(),
    )
    .increment(1);

    debug!(
        attempt = attempt,
        backoff_ms = duration.as_millis() as u64,
        "Retry backoff recorded"
    );
}

/// Record how long a task waited for its concurrency slot
pub fn record_gate_wait(wait: Duration) {
    histogram!("concurrency_gate_wait_seconds").record(wait.as_secs_f64());

    if wait.as_millis() > 100 {
        debug!(wait_ms = wait.as_millis() as u64, "Concurrency slot acquired after wait");
    }
}

/// Per-report outcome metrics
pub struct ReportMetrics {
    report: String,
    start_time: Instant,
}

impl ReportMetrics {
    /// Start tracking a report fetch
    pub fn start(report: impl Into<String>) -> Self {
        Self {
            report: report.into(),
            start_time: Instant::now(),
        }
    }

    /// Record a successful fetch
    pub fn record_success(&self, records: usize) {
        counter!(
            "reports_loaded_total",
            "report" => self.report.clone(),
            "status" => "success",
        )
        .increment(1);

        counter!(
            "report_records_total",
            "report" => self.report.clone(),
        )
        .increment(records as u64);

        debug!(
            report = %self.report,
            records = records,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Report metrics recorded"
        );
    }

    /// Record a failed fetch
    pub fn record_failure(&self) {
        counter!(
            "reports_loaded_total",
            "report" => self.report.clone(),
            "status" => "error",
        )
        .increment(1);
    }
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}
