//! JSON document consumed by downstream tooling
//!
//! ```text
//! {
//!   "metadata": { "generated_at": ..., "reports_count": N, "reports_loaded": [keys] },
//!   "reports": {
//!     "<key>": { "name": ..., "status": "success", "count": N, "data": [...] },
//!     "<key>": { "name": ..., "status": "error", "count": 0, "error": ...,
//!                "error_kind": ..., "http_code": 401 }
//!   }
//! }
//! ```
//!
//! Reports appear in requested order. Output is pretty-printed UTF-8.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{OutputResult, ReportWriter};
use crate::fetcher::FailureKind;
use crate::report::metrics::ProductMetrics;
use crate::report::{AggregatedReport, FetchOutcome, OutcomeStatus};
use crate::Record;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Default output file name for a report generated at `at`
pub fn default_filename(at: DateTime<Utc>) -> String {
    format!("wb_reports_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Serializable view of an [`AggregatedReport`]
#[derive(Debug, Serialize)]
pub struct OutputDocument<'a> {
    metadata: Metadata<'a>,
    reports: Reports<'a>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    generated_at: String,
    reports_count: usize,
    reports_loaded: &'a [String],
}

#[derive(Debug)]
struct Reports<'a>(&'a [FetchOutcome]);

#[derive(Debug, Serialize)]
struct ReportEntry<'a> {
    name: &'a str,
    status: OutcomeStatus,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a [Record]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_code: Option<u16>,
}

impl<'a> From<&'a FetchOutcome> for ReportEntry<'a> {
    fn from(outcome: &'a FetchOutcome) -> Self {
        let success = outcome.is_success();
        Self {
            name: outcome.display_name(),
            status: outcome.status(),
            count: outcome.record_count(),
            data: success.then(|| outcome.data()),
            error: outcome.error_message(),
            error_kind: outcome.failure_kind(),
            http_code: outcome.http_status(),
        }
    }
}

impl Serialize for Reports<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for outcome in self.0 {
            map.serialize_entry(outcome.key(), &ReportEntry::from(outcome))?;
        }
        map.end()
    }
}

impl<'a> OutputDocument<'a> {
    /// Build the document for `report`
    pub fn new(report: &'a AggregatedReport) -> Self {
        Self {
            metadata: Metadata {
                generated_at: report
                    .generated_at()
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                reports_count: report.len(),
                reports_loaded: report.requested_keys(),
            },
            reports: Reports(report.outcomes()),
        }
    }

    /// Pretty-printed JSON
    pub fn to_json_string(&self) -> OutputResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes the JSON document to a file
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    /// Write to an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write to `dir/wb_reports_<timestamp>.json`
    pub fn in_dir(dir: impl AsRef<Path>, at: DateTime<Utc>) -> Self {
        Self::new(dir.as_ref().join(default_filename(at)))
    }

    /// Target path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportWriter for JsonReportWriter {
    fn write_report(&self, report: &AggregatedReport) -> OutputResult<PathBuf> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);

        serde_json::to_writer_pretty(&mut writer, &OutputDocument::new(report))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        debug!(path = %self.path.display(), "Flushed report document");

        info!(
            path = %self.path.display(),
            reports = report.len(),
            "Report document written"
        );
        Ok(self.path.clone())
    }
}

/// Write article metrics as a pretty JSON array
pub fn write_metrics_json(path: &Path, metrics: &[ProductMetrics]) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, metrics)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!(path = %path.display(), articles = metrics.len(), "Metrics JSON written");
    Ok(())
}
