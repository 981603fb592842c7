//! Load command implementation

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::{Cli, CliError, OutputFormat};
use crate::config::ApiToken;
use crate::fetcher::wb_http::WbHttpClient;
use crate::loader::{OutcomeHook, ReportLoader};
use crate::output::{JsonReportWriter, ReportWriter};
use crate::registry::EndpointRegistry;
use crate::report::{self, AggregatedReport, FetchOutcome, ReportSummary};
use crate::shutdown::SharedShutdown;
use crate::DateRange;

const RULE_WIDTH: usize = 60;

/// Arguments for loading reports
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Report keys to load (see `list`)
    pub keys: Vec<String>,

    /// Load every registered report
    #[arg(long, conflicts_with = "keys")]
    pub all: bool,

    /// Start of the period (YYYY-MM-DD or RFC3339)
    #[arg(long)]
    pub from: String,

    /// End of the period (YYYY-MM-DD or RFC3339); defaults to the end of the start day
    #[arg(long)]
    pub to: Option<String>,

    /// Output file (default: <output dir>/wb_reports_<timestamp>.json)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Summary format
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,
}

impl LoadArgs {
    /// Load the requested reports, write the JSON document and print a summary
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let registry = EndpointRegistry::load()?;
        let keys = self.resolve_keys(&registry)?;
        let range = DateRange::parse(&self.from, self.to.as_deref())?;

        let config = cli.loader_config();
        config.validate()?;
        let token = ApiToken::from_env()?;
        let client = WbHttpClient::new()?.with_max_retries(config.max_retries);

        info!(
            reports = keys.len(),
            range = %range,
            base_url = %config.base_url,
            max_concurrency = config.max_concurrency,
            "Loading reports"
        );

        let progress =
            (self.format == OutputFormat::Human).then(|| create_progress_bar(keys.len()));

        let mut loader = ReportLoader::from_config(registry, Arc::new(client), token, &config)
            .with_shutdown(shutdown);
        if let Some(pb) = &progress {
            let pb = pb.clone();
            let hook: OutcomeHook = Arc::new(move |outcome: &FetchOutcome| {
                pb.set_message(outcome.key().to_string());
                pb.inc(1);
            });
            loader = loader.with_outcome_hook(hook);
        }

        let result = loader.load_reports(&keys, &range).await;
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }
        let report = result?;

        let writer = match &self.output {
            Some(path) => JsonReportWriter::new(path),
            None => JsonReportWriter::in_dir(&config.output_dir, report.generated_at()),
        };
        let path = writer.write_report(&report)?;

        let summary = report::summarize(&report);
        match self.format {
            OutputFormat::Human => println!("{}", render_human(&report, &summary, &path)),
            OutputFormat::Json => println!("{}", render_json(&report, &summary, &path)?),
        }

        Ok(())
    }

    fn resolve_keys(&self, registry: &EndpointRegistry) -> Result<Vec<String>, CliError> {
        if self.all {
            return Ok(registry.all_keys().into_iter().map(str::to_string).collect());
        }
        if self.keys.is_empty() {
            return Err(CliError::InvalidArgument(
                "no reports requested: pass report keys or --all (see `list`)".to_string(),
            ));
        }
        Ok(self.keys.clone())
    }
}

/// Create progress bar with style
fn create_progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message("loading reports");
    pb
}

fn render_human(report: &AggregatedReport, summary: &ReportSummary, path: &Path) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let mut out = format!("{heavy}\nREPORT LOAD SUMMARY\n{heavy}\n");
    for outcome in report.outcomes() {
        match (outcome.error_message(), outcome.failure_kind()) {
            (Some(message), Some(kind)) => {
                out.push_str(&format!(
                    "[FAILED] {} ({}): {}\n         hint: {}\n",
                    outcome.display_name(),
                    outcome.key(),
                    message,
                    kind.suggestion()
                ));
            }
            _ => {
                out.push_str(&format!(
                    "[OK]     {} ({}): {} records\n",
                    outcome.display_name(),
                    outcome.key(),
                    outcome.record_count()
                ));
            }
        }
    }
    out.push_str(&format!(
        "{light}\nLoaded {}/{} reports, {} records\nSaved to: {}",
        summary.success_count,
        report.len(),
        summary.total_records,
        path.display()
    ));
    out
}

fn render_json(
    report: &AggregatedReport,
    summary: &ReportSummary,
    path: &Path,
) -> Result<String, CliError> {
    let reports: Vec<_> = report
        .outcomes()
        .iter()
        .map(|o| {
            json!({
                "key": o.key(),
                "name": o.display_name(),
                "status": o.status(),
                "count": o.record_count(),
                "error": o.error_message(),
                "http_code": o.http_status(),
            })
        })
        .collect();

    serde_json::to_string_pretty(&json!({
        "output": path.display().to_string(),
        "summary": summary,
        "reports": reports,
    }))
    .map_err(|e| CliError::InvalidArgument(format!("failed to serialize summary: {e}")))
}
