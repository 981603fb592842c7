//! Output writers

use crate::report::metrics::ProductMetrics;
use crate::report::AggregatedReport;
use std::path::{Path, PathBuf};

pub mod csv;
pub mod json;

pub use self::csv::write_metrics_csv;
pub use json::{default_filename, write_metrics_json, JsonReportWriter, OutputDocument};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// CSV writing error
    #[error("CSV error: {0}")]
    CsvError(String),
}

impl From<std::io::Error> for OutputError {
    fn from(err: std::io::Error) -> Self {
        OutputError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(err: serde_json::Error) -> Self {
        OutputError::SerializationError(err.to_string())
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Persists an aggregated report
pub trait ReportWriter {
    /// Write the report and return where it was written
    fn write_report(&self, report: &AggregatedReport) -> OutputResult<PathBuf>;
}

/// Export article metrics; a `.csv` extension selects CSV, anything else JSON
pub fn write_metrics(path: &Path, metrics: &[ProductMetrics]) -> OutputResult<()> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_metrics_csv(path, metrics)
    } else {
        write_metrics_json(path, metrics)
    }
}
