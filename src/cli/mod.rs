//! CLI command implementations

pub mod analyze;
pub mod error;
pub mod list;
pub mod load;

pub use analyze::AnalyzeArgs;
pub use error::CliError;
pub use list::ListCommand;
pub use load::LoadArgs;

use crate::config::LoaderConfig;
use crate::loader::config::MAX_CONCURRENCY;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Wildberries report loader CLI
#[derive(Parser, Debug)]
#[command(name = "wb-report-loader")]
#[command(
    about = "Load several Wildberries statistics reports concurrently into one JSON file",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL (overrides WB_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(
        long,
        global = true,
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..=600)
    )]
    pub timeout_secs: u64,

    /// Number of reports fetched at once (default: 4, max: 32)
    #[arg(long, global = true, default_value = "4", value_parser = parse_concurrency)]
    pub max_concurrency: usize,

    /// Minimum delay between request starts in milliseconds
    #[arg(long, global = true, default_value = "0")]
    pub request_delay_ms: u64,

    /// Retries on timeouts, 429 and 5xx responses (default: 0, max: 10)
    #[arg(
        long,
        global = true,
        default_value = "0",
        value_parser = clap::value_parser!(u32).range(0..=10)
    )]
    pub max_retries: u32,

    /// Expose Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Environment configuration overlaid with command-line flags
    pub fn loader_config(&self) -> LoaderConfig {
        let mut config = LoaderConfig::from_env();
        if let Some(url) = &self.api_url {
            config.base_url = url.clone();
        }
        config.request_timeout = Duration::from_secs(self.timeout_secs);
        config.max_concurrency = self.max_concurrency;
        config.request_delay = Duration::from_millis(self.request_delay_ms);
        config.max_retries = self.max_retries;
        config
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available reports
    List(ListCommand),

    /// Load reports for a date range
    Load(LoadArgs),

    /// Per-article financial metrics from a loaded realization report
    Analyze(AnalyzeArgs),
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
