//! Per-article financial metrics over the realization report
//!
//! Rows of the `reportDetail` report are grouped by article (`nm_id`) into
//! [`ProductFigures`], then combined with seller-supplied [`ManualInputs`]
//! (unit cost, self-purchases, giveaways, marketing) into [`ProductMetrics`]:
//!
//! - COGS = (sales - returns - self-purchases - giveaways) * unit cost + giveaway cost
//! - gross profit = revenue - COGS
//! - expenses = logistics + storage + penalties + acceptance + commission
//!   + advertising + marketing - surcharges
//! - net profit = gross profit - expenses
//! - margin % = gross profit / revenue * 100, ROI % = net profit / COGS * 100,
//!   average check = revenue / sales (all 0 when the divisor is 0)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;

use crate::Record;

/// Report key whose rows feed the calculator
pub const REALIZATION_REPORT_KEY: &str = "reportDetail";

/// Costs-file entry applied to articles without their own entry
pub const DEFAULT_COSTS_KEY: &str = "*";

const SALE_DOC_TYPE: &str = "Продажа";
const RETURN_DOC_TYPE: &str = "Возврат";

/// Errors while preparing a metrics calculation
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// File could not be read
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    /// File is not valid JSON of the expected shape
    #[error("invalid JSON in {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// The document has no entry for the report
    #[error("report '{0}' is not present in the document")]
    ReportMissing(String),

    /// The report failed when it was loaded
    #[error("report '{key}' was not loaded successfully: {message}")]
    ReportFailed { key: String, message: String },
}

/// Seller-supplied figures the API does not know about
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManualInputs {
    /// Purchase cost of one unit
    pub cost_per_unit: Decimal,
    /// Units bought back by the seller
    pub self_purchase_count: i64,
    /// Units given away
    pub giveaway_count: i64,
    /// Cost of the given-away units
    pub giveaway_cost: Decimal,
    /// Marketing spend outside the marketplace
    pub marketing_cost: Decimal,
}

/// Manual inputs keyed by article, with an optional `"*"` fallback
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct CostBook(HashMap<String, ManualInputs>);

impl CostBook {
    /// Parse a costs file: `{"<nm_id>": {"cost_per_unit": 450, ...}, "*": {...}}`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        read_json(path.as_ref())
    }

    /// Inputs for `nm_id`, falling back to the `"*"` entry, then to zeros
    pub fn inputs_for(&self, nm_id: i64) -> ManualInputs {
        self.0
            .get(&nm_id.to_string())
            .or_else(|| self.0.get(DEFAULT_COSTS_KEY))
            .cloned()
            .unwrap_or_default()
    }
}

/// Marketplace figures of one article over the report period
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFigures {
    pub nm_id: i64,
    pub product_name: String,
    /// Units sold
    pub sales: i64,
    /// Units returned
    pub returns: i64,
    /// Retail amount of sales minus returns, after the marketplace discount
    pub revenue: Decimal,
    pub logistics_cost: Decimal,
    pub storage_cost: Decimal,
    pub acceptance_cost: Decimal,
    pub penalty_cost: Decimal,
    /// Extra payments to the seller; reduce expenses
    pub surcharges: Decimal,
    pub commission: Decimal,
    /// Advertising charges withheld from the payout
    pub advertising_cost: Decimal,
}

impl ProductFigures {
    fn new(nm_id: i64) -> Self {
        Self {
            nm_id,
            ..Self::default()
        }
    }

    fn add_row(&mut self, row: &Record) {
        if self.product_name.is_empty() {
            if let Some(name) = row.get("sa_name").and_then(Value::as_str) {
                self.product_name = name.to_string();
            }
        }

        let quantity = row.get("quantity").and_then(Value::as_i64).unwrap_or(0);
        let retail = decimal_field(row, "retail_amount");
        match row.get("doc_type_name").and_then(Value::as_str) {
            Some(SALE_DOC_TYPE) => {
                self.sales += quantity;
                self.revenue += retail;
            }
            Some(RETURN_DOC_TYPE) => {
                self.returns += quantity;
                self.revenue -= retail;
            }
            _ => {}
        }

        self.logistics_cost += decimal_field(row, "delivery_rub");
        self.storage_cost += decimal_field(row, "storage_fee");
        self.acceptance_cost += decimal_field(row, "acceptance");
        self.penalty_cost += decimal_field(row, "penalty");
        self.surcharges += decimal_field(row, "additional_payment");
        self.commission += decimal_field(row, "ppvz_sales_commission");
        self.advertising_cost += decimal_field(row, "deduction");
    }
}

/// Group realization rows by article. Rows without an `nm_id` are skipped.
/// Articles come back in ascending `nm_id` order.
pub fn figures_from_records(records: &[Record]) -> Vec<ProductFigures> {
    let mut by_article: BTreeMap<i64, ProductFigures> = BTreeMap::new();
    for row in records {
        let Some(nm_id) = row.get("nm_id").and_then(Value::as_i64).filter(|id| *id > 0) else {
            continue;
        };
        by_article
            .entry(nm_id)
            .or_insert_with(|| ProductFigures::new(nm_id))
            .add_row(row);
    }
    by_article.into_values().collect()
}

/// Calculated metrics of one article
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductMetrics {
    pub nm_id: i64,
    pub product_name: String,
    pub sales: i64,
    pub returns: i64,
    pub net_sales: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cogs: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_profit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_profit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub profit_margin_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub roi_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_check: Decimal,
}

/// Cost of goods sold, including giveaway cost
pub fn cogs(figures: &ProductFigures, inputs: &ManualInputs) -> Decimal {
    let net_sold =
        figures.sales - figures.returns - inputs.self_purchase_count - inputs.giveaway_count;
    Decimal::from(net_sold) * inputs.cost_per_unit + inputs.giveaway_cost
}

/// All marketplace and marketing expenses, surcharges deducted
pub fn total_expenses(figures: &ProductFigures, inputs: &ManualInputs) -> Decimal {
    figures.logistics_cost
        + figures.storage_cost
        + figures.penalty_cost
        + figures.acceptance_cost
        + figures.commission
        + figures.advertising_cost
        + inputs.marketing_cost
        - figures.surcharges
}

fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        part / whole * Decimal::ONE_HUNDRED
    }
}

/// Compute every metric for one article. Ratios are rounded to 2 places.
pub fn calculate(figures: &ProductFigures, inputs: &ManualInputs) -> ProductMetrics {
    let cogs = cogs(figures, inputs);
    let gross_profit = figures.revenue - cogs;
    let total_expenses = total_expenses(figures, inputs);
    let net_profit = gross_profit - total_expenses;

    let avg_check = if figures.sales == 0 {
        Decimal::ZERO
    } else {
        figures.revenue / Decimal::from(figures.sales)
    };

    ProductMetrics {
        nm_id: figures.nm_id,
        product_name: figures.product_name.clone(),
        sales: figures.sales,
        returns: figures.returns,
        net_sales: figures.sales - figures.returns - inputs.self_purchase_count,
        revenue: figures.revenue,
        cogs,
        gross_profit,
        total_expenses,
        net_profit,
        profit_margin_percent: percent_of(gross_profit, figures.revenue).round_dp(2),
        roi_percent: percent_of(net_profit, cogs).round_dp(2),
        avg_check: avg_check.round_dp(2),
    }
}

/// Metrics for every article in `records`, inputs looked up in `costs`
pub fn calculate_all(records: &[Record], costs: &CostBook) -> Vec<ProductMetrics> {
    figures_from_records(records)
        .iter()
        .map(|figures| calculate(figures, &costs.inputs_for(figures.nm_id)))
        .collect()
}

/// Totals across articles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cogs: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_profit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_profit: Decimal,
}

/// Sum revenue, COGS and profits
pub fn totals(metrics: &[ProductMetrics]) -> MetricsTotals {
    metrics.iter().fold(MetricsTotals::default(), |mut acc, m| {
        acc.revenue += m.revenue;
        acc.cogs += m.cogs;
        acc.gross_profit += m.gross_profit;
        acc.net_profit += m.net_profit;
        acc
    })
}

/// Articles ordered by net profit, most profitable first
pub fn ranked_by_net_profit(metrics: &[ProductMetrics]) -> Vec<&ProductMetrics> {
    let mut ranked: Vec<_> = metrics.iter().collect();
    ranked.sort_by(|a, b| b.net_profit.cmp(&a.net_profit).then(a.nm_id.cmp(&b.nm_id)));
    ranked
}

/// Rows of the realization report inside a saved load document
pub fn realization_records(document: &Value) -> Result<Vec<Record>, AnalysisError> {
    let entry = document
        .get("reports")
        .and_then(|reports| reports.get(REALIZATION_REPORT_KEY))
        .ok_or_else(|| AnalysisError::ReportMissing(REALIZATION_REPORT_KEY.to_string()))?;

    if entry.get("status").and_then(Value::as_str) != Some("success") {
        return Err(AnalysisError::ReportFailed {
            key: REALIZATION_REPORT_KEY.to_string(),
            message: entry
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    Ok(entry
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

/// Read a saved load document and extract the realization rows
pub fn realization_records_from_file(
    path: impl AsRef<Path>,
) -> Result<Vec<Record>, AnalysisError> {
    let document: Value = read_json(path.as_ref())?;
    realization_records(&document)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AnalysisError> {
    let text = std::fs::read_to_string(path).map_err(|e| AnalysisError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| AnalysisError::InvalidJson {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn decimal_field(row: &Record, name: &str) -> Decimal {
    match row.get(name) {
        Some(Value::Number(n)) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .unwrap_or_default()
        }
        Some(Value::String(s)) => Decimal::from_str(s.trim()).unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}
