//! CLI error types and conversions

use crate::config::ConfigError;
use crate::fetcher::TransportError;
use crate::loader::LoadError;
use crate::output::OutputError;
use crate::registry::RegistryError;
use crate::report::metrics::AnalysisError;
use crate::DateRangeError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Registry error
    #[error("registry error: {0}")]
    RegistryError(#[from] RegistryError),

    /// Load error
    #[error("load error: {0}")]
    LoadError(#[from] LoadError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// HTTP client setup error
    #[error("HTTP client error: {0}")]
    TransportError(#[from] TransportError),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(#[from] ConfigError),

    /// Date range could not be parsed
    #[error("invalid date range: {0}")]
    DateRangeError(#[from] DateRangeError),

    /// Metrics input could not be prepared
    #[error("analysis error: {0}")]
    AnalysisError(#[from] AnalysisError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
