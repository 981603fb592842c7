//! Analyze command: financial metrics from a saved realization report

use clap::Args;
use rust_decimal::Decimal;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use super::{CliError, OutputFormat};
use crate::output;
use crate::report::metrics::{self, CostBook, MetricsTotals, ProductMetrics};

const RULE_WIDTH: usize = 60;
const TOP_N: usize = 3;

/// Arguments for computing per-article metrics
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Document written by `load` that contains the reportDetail report
    pub input: PathBuf,

    /// Per-article manual inputs: {"<nm_id>": {"cost_per_unit": ...}, "*": {...}}
    #[arg(long)]
    pub costs: Option<PathBuf>,

    /// Export metrics to this file (.csv for CSV, anything else JSON)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Summary format
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,
}

impl AnalyzeArgs {
    /// Compute metrics, optionally export them, and print a summary
    pub fn execute(&self) -> Result<(), CliError> {
        let records = metrics::realization_records_from_file(&self.input)?;
        let costs = match &self.costs {
            Some(path) => CostBook::from_file(path)?,
            None => CostBook::default(),
        };

        let results = metrics::calculate_all(&records, &costs);
        info!(rows = records.len(), articles = results.len(), "Metrics calculated");

        if let Some(path) = &self.output {
            output::write_metrics(path, &results)?;
        }

        let totals = metrics::totals(&results);
        match self.format {
            OutputFormat::Human => println!("{}", render_human(&results, &totals)),
            OutputFormat::Json => println!("{}", render_json(&results, &totals)?),
        }
        Ok(())
    }
}

fn label(m: &ProductMetrics) -> String {
    if m.product_name.is_empty() {
        format!("nm_id {}", m.nm_id)
    } else {
        format!("{} (nm_id {})", m.product_name, m.nm_id)
    }
}

fn money(value: Decimal) -> Decimal {
    value.round_dp(2)
}

fn render_human(results: &[ProductMetrics], totals: &MetricsTotals) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let mut out = format!("{heavy}\nARTICLE METRICS ({} articles)\n{heavy}\n", results.len());
    if results.is_empty() {
        out.push_str("No realization rows with an article id");
        return out;
    }

    out.push_str(&format!(
        "Revenue:      {}\nCOGS:         {}\nGross profit: {}\nNet profit:   {}\n",
        money(totals.revenue),
        money(totals.cogs),
        money(totals.gross_profit),
        money(totals.net_profit)
    ));

    let ranked = metrics::ranked_by_net_profit(results);
    let line = |m: &ProductMetrics| {
        format!(
            "  {}: net profit {} | margin {}% | ROI {}%\n",
            label(m),
            money(m.net_profit),
            m.profit_margin_percent,
            m.roi_percent
        )
    };

    out.push_str("\nMost profitable:\n");
    for m in ranked.iter().take(TOP_N) {
        out.push_str(&line(m));
    }
    out.push_str("\nLeast profitable:\n");
    for m in ranked.iter().rev().take(TOP_N) {
        out.push_str(&line(m));
    }
    out.truncate(out.trim_end().len());
    out
}

fn render_json(results: &[ProductMetrics], totals: &MetricsTotals) -> Result<String, CliError> {
    serde_json::to_string_pretty(&json!({
        "totals": totals,
        "articles": results,
    }))
    .map_err(|e| CliError::InvalidArgument(format!("failed to serialize metrics: {e}")))
}
