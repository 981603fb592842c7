//! CSV export of per-article metrics

use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult};
use crate::report::metrics::ProductMetrics;

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// CSV row for one article; amounts keep their exact decimal text
#[derive(Debug, Serialize)]
struct MetricsRecord<'a> {
    nm_id: i64,
    product_name: &'a str,
    sales: i64,
    returns: i64,
    net_sales: i64,
    revenue: String,
    cogs: String,
    gross_profit: String,
    total_expenses: String,
    net_profit: String,
    profit_margin_percent: String,
    roi_percent: String,
    avg_check: String,
}

impl<'a> From<&'a ProductMetrics> for MetricsRecord<'a> {
    fn from(m: &'a ProductMetrics) -> Self {
        Self {
            nm_id: m.nm_id,
            product_name: &m.product_name,
            sales: m.sales,
            returns: m.returns,
            net_sales: m.net_sales,
            revenue: m.revenue.to_string(),
            cogs: m.cogs.to_string(),
            gross_profit: m.gross_profit.to_string(),
            total_expenses: m.total_expenses.to_string(),
            net_profit: m.net_profit.to_string(),
            profit_margin_percent: m.profit_margin_percent.to_string(),
            roi_percent: m.roi_percent.to_string(),
            avg_check: m.avg_check.to_string(),
        }
    }
}

/// Write one CSV row per article, header first
pub fn write_metrics_csv(path: &Path, metrics: &[ProductMetrics]) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
    }

    let file = File::create(path)
        .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;
    let mut writer = Writer::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

    for m in metrics {
        writer
            .serialize(MetricsRecord::from(m))
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;
    }
    writer
        .flush()
        .map_err(|e| OutputError::IoError(format!("Failed to flush: {}", e)))?;
    debug!(rows = metrics.len(), "Flushed metrics CSV");

    info!(path = %path.display(), articles = metrics.len(), "Metrics CSV written");
    Ok(())
}
