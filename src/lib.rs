//! # WB Report Loader Library
//!
//! Loads several independent reports from the Wildberries statistics API
//! concurrently and merges them into one structured result.
//!
//! ## Features
//!
//! - **Concurrent Fan-out**: One task per requested report on the multi-threaded runtime
//! - **Failure Isolation**: A failing report is recorded as data and never aborts the others
//! - **Bounded Concurrency**: Optional in-flight cap and fixed spacing between request starts
//! - **Cancellation**: A shared shutdown handle aborts every in-flight report
//! - **Deterministic Output**: Reports are keyed and ordered exactly as requested
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wb_report_loader::config::ApiToken;
//! use wb_report_loader::fetcher::wb_http::WbHttpClient;
//! use wb_report_loader::loader::ReportLoader;
//! use wb_report_loader::registry::EndpointRegistry;
//! use wb_report_loader::DateRange;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = EndpointRegistry::load()?;
//! let client = Arc::new(WbHttpClient::new()?);
//! let token = ApiToken::new("secret")?;
//!
//! let loader = ReportLoader::new(registry, client, token).with_max_concurrency(4);
//! let range = DateRange::parse("2025-10-13", Some("2025-10-19"))?;
//! let report = loader.load_reports(&["sales", "orders", "stocks"], &range).await?;
//!
//! let summary = wb_report_loader::report::summarize(&report);
//! println!("{} ok, {} failed", summary.success_count, summary.error_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`registry`] - Read-only registry of report endpoints and their parameter shapes
//! - [`fetcher`] - Request capability seam and the reqwest-backed client
//! - [`loader`] - Fetch tasks, the concurrency gate and the fan-out/fan-in scheduler
//! - [`report`] - Fetch outcomes, aggregation, summary statistics and per-article metrics
//! - [`output`] - JSON document for downstream consumers, metrics as CSV or JSON
//! - [`shutdown`] - Cancellation shared between the CLI and in-flight loads

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// CLI command implementations
pub mod cli;

/// Loader configuration
pub mod config;

/// Request capability and HTTP client
pub mod fetcher;

/// Concurrent report loading
pub mod loader;

/// Observability metrics
pub mod metrics;

/// Output writers
pub mod output;

/// Report endpoint registry
pub mod registry;

/// Fetch outcomes and aggregation
pub mod report;

/// Cancellation coordination shared across modules
pub mod shutdown;

pub use loader::{LoadError, ReportLoader};
pub use registry::{EndpointDefinition, EndpointRegistry, ParamShape};
pub use report::{AggregatedReport, FetchOutcome, OutcomeStatus, ReportSummary};

/// A single record returned by a report endpoint. Records are passed through untouched.
pub type Record = serde_json::Value;

/// Inclusive reporting period sent to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Start of the period
    pub from: DateTime<Utc>,
    /// End of the period
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// Create a range from two timestamps. No ordering check is done here,
    /// see [`DateRange::validate`].
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Parse a range from `YYYY-MM-DD` or RFC3339 inputs.
    ///
    /// A date-only start means 00:00:00 UTC and a date-only end means 23:59:59 UTC.
    /// When `to` is omitted the range ends at the end of the start day for date-only
    /// input, or at the start instant itself for RFC3339 input.
    pub fn parse(from: &str, to: Option<&str>) -> Result<Self, DateRangeError> {
        let start = parse_bound(from, Bound::Start)?;
        let end = match to {
            Some(to) => parse_bound(to, Bound::End)?,
            None if is_date_only(from) => parse_bound(from, Bound::End)?,
            None => start,
        };

        let range = Self::new(start, end);
        range.validate()?;
        Ok(range)
    }

    /// Check that the range is not inverted.
    pub fn validate(&self) -> Result<(), DateRangeError> {
        if self.from > self.to {
            return Err(DateRangeError::Inverted {
                from: self.from_rfc3339(),
                to: self.to_rfc3339(),
            });
        }
        Ok(())
    }

    /// Start as RFC3339 with a `Z` suffix (e.g. `2025-10-13T00:00:00Z`).
    pub fn from_rfc3339(&self) -> String {
        self.from.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// End as RFC3339 with a `Z` suffix.
    pub fn to_rfc3339(&self) -> String {
        self.to.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Start as `YYYY-MM-DD`.
    pub fn from_date(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    /// End as `YYYY-MM-DD`.
    pub fn to_date(&self) -> String {
        self.to.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.from_rfc3339(), self.to_rfc3339())
    }
}

/// Date range parse and validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateRangeError {
    /// Input is neither `YYYY-MM-DD` nor RFC3339
    #[error("invalid date '{input}': expected YYYY-MM-DD or RFC3339")]
    InvalidFormat {
        /// The rejected input
        input: String,
    },

    /// Start is after end
    #[error("date range start {from} is after end {to}")]
    Inverted {
        /// Start as RFC3339
        from: String,
        /// End as RFC3339
        to: String,
    },
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn is_date_only(input: &str) -> bool {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").is_ok()
}

fn parse_bound(input: &str, bound: Bound) -> Result<DateTime<Utc>, DateRangeError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Timestamps without an offset are taken as UTC
    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Ok(dt.with_timezone(&Utc));
    }

    let invalid = || DateRangeError::InvalidFormat {
        input: input.to_string(),
    };

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| invalid())?;
    let datetime = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_opt(23, 59, 59),
    }
    .ok_or_else(invalid)?;

    Ok(datetime.and_utc())
}
