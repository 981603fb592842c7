//! End-to-end tests for the command-line interface

use assert_cmd::Command;
use httpmock::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

use crate::common::*;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("wb-report-loader").unwrap();
    cmd.env_remove("WB_API_KEY")
        .env_remove("WB_API_URL")
        .env_remove("WB_OUTPUT_DIR")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_list_shows_registered_reports() {
    let output = cmd().arg("list").assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();

    assert!(text.contains("reportDetail"));
    assert!(text.contains("characteristics_change"));
    assert!(text.contains("Seller balance"));
}

#[test]
fn test_list_json_format() {
    let output = cmd()
        .args(["list", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 13);
}

#[test]
fn test_load_unknown_report_fails() {
    cmd()
        .env("WB_API_KEY", "secret-key")
        .args(["load", "doesnotexist", "--from", "2025-10-13"])
        .assert()
        .failure();
}

#[test]
fn test_load_without_api_key_fails() {
    let dir = TempDir::new().unwrap();
    cmd()
        .env("WB_OUTPUT_DIR", dir.path())
        .args(["load", "sales", "--from", "2025-10-13"])
        .assert()
        .failure();

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_load_requires_report_selection() {
    cmd()
        .env("WB_API_KEY", "secret-key")
        .args(["load", "--from", "2025-10-13"])
        .assert()
        .failure();
}

#[test]
fn test_load_rejects_excess_concurrency() {
    cmd()
        .env("WB_API_KEY", "secret-key")
        .args(["--max-concurrency", "64", "load", "sales", "--from", "2025-10-13"])
        .assert()
        .failure();
}

#[test]
fn test_load_end_to_end_against_mock_server() {
    let server = MockServer::start();
    let sales = server.mock(|when, then| {
        when.method(GET)
            .path(SALES_PATH)
            .query_param("dateFrom", "2025-10-13T00:00:00Z")
            .header("authorization", "Bearer secret-key")
            .header("content-type", "application/json");
        then.status(200).body(records_json(3));
    });
    let orders = server.mock(|when, then| {
        when.method(GET)
            .path(ORDERS_PATH)
            .header("authorization", "Bearer secret-key");
        then.status(401).body("unauthorized");
    });

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("reports.json");

    let output = cmd()
        .env("WB_API_KEY", "secret-key")
        .args([
            "--api-url",
            &server.base_url(),
            "load",
            "sales",
            "orders",
            "--from",
            "2025-10-13",
            "--to",
            "2025-10-19",
            "--output",
        ])
        .arg(&out)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary = String::from_utf8(output).unwrap();
    assert!(summary.contains("[OK]     Sales and returns (sales): 3 records"));
    assert!(summary.contains("[FAILED] Orders (orders): HTTP 401"));

    let doc: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(doc["reports"]["sales"]["count"], 3);
    assert_eq!(doc["reports"]["orders"]["http_code"], 401);

    sales.assert();
    orders.assert();
}

fn realization_document() -> String {
    serde_json::json!({
        "metadata": {"generated_at": "2025-10-20T09:30:00Z", "reports_count": 1,
                     "reports_loaded": ["reportDetail"]},
        "reports": {
            "reportDetail": {
                "name": "Sales realization report (v5)",
                "status": "success",
                "count": 3,
                "data": [
                    {"nm_id": 1001, "sa_name": "Mug", "doc_type_name": "Продажа",
                     "quantity": 10, "retail_amount": 10000, "delivery_rub": 500,
                     "ppvz_sales_commission": 1500},
                    {"nm_id": 1001, "doc_type_name": "Возврат", "quantity": 1,
                     "retail_amount": 1000},
                    {"nm_id": 2002, "sa_name": "Plate", "doc_type_name": "Продажа",
                     "quantity": 2, "retail_amount": 800}
                ]
            }
        }
    })
    .to_string()
}

#[test]
fn test_analyze_exports_metrics_csv() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("reports.json");
    let costs = dir.path().join("costs.json");
    let out = dir.path().join("metrics.csv");
    fs::write(&input, realization_document()).unwrap();
    fs::write(
        &costs,
        r#"{"1001": {"cost_per_unit": 300}, "*": {"cost_per_unit": 100}}"#,
    )
    .unwrap();

    let output = cmd()
        .arg("analyze")
        .arg(&input)
        .arg("--costs")
        .arg(&costs)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary = String::from_utf8(output).unwrap();
    assert!(summary.contains("ARTICLE METRICS (2 articles)"));
    assert!(summary.contains("Mug (nm_id 1001)"));

    let csv = fs::read_to_string(&out).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 3);
    // 9 net units at 300: COGS 2700, gross 6300, expenses 2000, net 4300
    assert!(rows[1].starts_with("1001,Mug,10,1,9,9000,2700,6300,2000,4300,"), "{}", rows[1]);
    assert!(rows[2].starts_with("2002,Plate,2,0,2,800,200,600,0,600,"), "{}", rows[2]);
}

#[test]
fn test_analyze_json_summary() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("reports.json");
    fs::write(&input, realization_document()).unwrap();

    let output = cmd()
        .arg("analyze")
        .arg(&input)
        .args(["--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parsed["totals"]["revenue"], 9800.0);
    assert_eq!(parsed["articles"][0]["avg_check"], 900.0);
}

#[test]
fn test_analyze_rejects_failed_realization_report() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("reports.json");
    fs::write(
        &input,
        r#"{"reports": {"reportDetail": {"status": "error", "count": 0, "error": "HTTP 401"}}}"#,
    )
    .unwrap();

    cmd().arg("analyze").arg(&input).assert().failure();
}
