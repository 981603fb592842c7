//! Integration tests for the JSON output document

use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use wb_report_loader::output::{JsonReportWriter, ReportWriter};

use crate::common::*;

#[tokio::test]
async fn test_loaded_reports_written_in_request_order() {
    let mock = Arc::new(
        MockApi::new()
            .respond(SALES_PATH, 200, r#"[{"saleID":"S1","forPay":100.5}]"#)
            .respond(BALANCE_PATH, 403, "forbidden"),
    );
    let report = loader_with(mock)
        .load_reports(&["stocks", "sales", "balance"], &week())
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let path = JsonReportWriter::in_dir(dir.path(), report.generated_at())
        .write_report(&report)
        .unwrap();

    let file_name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("wb_reports_"));
    assert!(file_name.ends_with(".json"));

    let text = fs::read_to_string(&path).unwrap();
    let doc: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(doc["metadata"]["reports_count"], 3);
    assert_eq!(doc["metadata"]["reports_loaded"], json!(["stocks", "sales", "balance"]));

    let keys: Vec<&String> = doc["reports"].as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 3);
    let stocks_at = text.find("\"stocks\": {").unwrap();
    let sales_at = text.find("\"sales\": {").unwrap();
    let balance_at = text.find("\"balance\": {").unwrap();
    assert!(stocks_at < sales_at && sales_at < balance_at);

    assert_eq!(doc["reports"]["sales"]["name"], "Sales and returns");
    assert_eq!(doc["reports"]["sales"]["count"], 1);
    assert_eq!(doc["reports"]["sales"]["data"][0]["forPay"], 100.5);

    assert_eq!(doc["reports"]["balance"]["status"], "error");
    assert_eq!(doc["reports"]["balance"]["http_code"], 403);
    assert_eq!(doc["reports"]["balance"]["error"], "HTTP 403 (access denied): forbidden");

    assert_eq!(doc["reports"]["stocks"]["status"], "success");
    assert_eq!(doc["reports"]["stocks"]["data"], json!([]));
}

#[tokio::test]
async fn test_explicit_output_path_creates_parents() {
    let mock = Arc::new(MockApi::new());
    let report = loader_with(mock)
        .load_reports(&["sales"], &week())
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a").join("b").join("out.json");
    let written = JsonReportWriter::new(&target).write_report(&report).unwrap();

    assert_eq!(written, target);
    assert!(target.exists());
}
