//! Integration tests for the load_reports fan-out/fan-in contract

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wb_report_loader::fetcher::FailureKind;
use wb_report_loader::loader::OutcomeHook;
use wb_report_loader::{report, DateRange, LoadError, OutcomeStatus};

use crate::common::*;

#[tokio::test]
async fn test_every_requested_key_has_one_outcome() {
    let mock = Arc::new(
        MockApi::new()
            .respond(SALES_PATH, 200, records_json(3))
            .respond(ORDERS_PATH, 200, records_json(2))
            .respond(STOCKS_PATH, 200, "[]"),
    );

    let report = loader_with(mock.clone())
        .load_reports(&["sales", "orders", "stocks"], &week())
        .await
        .unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(mock.calls(), 3);
    assert_eq!(report.get("sales").unwrap().record_count(), 3);
    assert_eq!(report.get("orders").unwrap().record_count(), 2);
    assert_eq!(report.get("stocks").unwrap().record_count(), 0);
    assert!(report.outcomes().iter().all(|o| o.status() == OutcomeStatus::Success));
}

#[tokio::test]
async fn test_unknown_key_fails_without_requests() {
    let mock = Arc::new(MockApi::new());

    let err = loader_with(mock.clone())
        .load_reports(&["sales", "doesnotexist"], &week())
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::UnknownEndpoint(ref key) if key == "doesnotexist"));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_inverted_range_fails_without_requests() {
    let mock = Arc::new(MockApi::new());
    let week = week();
    let inverted = DateRange::new(week.to, week.from);

    let err = loader_with(mock.clone())
        .load_reports(&["sales"], &inverted)
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::InvalidDateRange(_)));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_query_parameters_follow_endpoint_shape() {
    let mock = Arc::new(MockApi::new());

    loader_with(mock.clone())
        .load_reports(
            &["sales", "reportDetail", "penalties", "antifraud", "balance"],
            &week(),
        )
        .await
        .unwrap();

    let sales = mock.request_for(SALES_PATH).unwrap();
    assert_eq!(sales.url, "http://mock.local/api/v1/supplier/sales");
    assert_eq!(sales.query, vec![("dateFrom".to_string(), "2025-10-13T00:00:00Z".to_string())]);
    assert_eq!(sales.auth_token, TEST_TOKEN);

    let detail = mock.request_for("/api/v5/supplier/reportDetailByPeriod").unwrap();
    assert_eq!(detail.param("dateFrom"), Some("2025-10-13"));
    assert_eq!(detail.param("dateTo"), Some("2025-10-19"));
    assert_eq!(detail.param("limit"), Some("100000"));

    let penalties = mock.request_for("/api/v1/analytics/warehouse-measurements").unwrap();
    assert_eq!(penalties.param("dateFrom"), Some("2025-10-13T00:00:00Z"));
    assert_eq!(penalties.param("dateTo"), Some("2025-10-19T23:59:59Z"));
    assert_eq!(penalties.param("tab"), Some("penalty"));
    assert_eq!(penalties.param("limit"), Some("1000"));

    let antifraud = mock.request_for("/api/v1/analytics/antifraud-details").unwrap();
    assert_eq!(antifraud.query, vec![("date".to_string(), "2025-10-19".to_string())]);

    let balance = mock.request_for(BALANCE_PATH).unwrap();
    assert!(balance.query.is_empty());
}

#[tokio::test]
async fn test_object_body_counts_as_one_record() {
    let mock = Arc::new(MockApi::new().respond(
        BALANCE_PATH,
        200,
        r#"{"currency":"RUB","current":1200.5}"#,
    ));

    let report = loader_with(mock)
        .load_reports(&["balance"], &week())
        .await
        .unwrap();

    let balance = report.get("balance").unwrap();
    assert!(balance.is_success());
    assert_eq!(balance.record_count(), 1);
    assert_eq!(balance.data()[0]["currency"], "RUB");
}

#[tokio::test]
async fn test_http_error_message_is_truncated() {
    let body = "x".repeat(600);
    let mock = Arc::new(MockApi::new().respond(SALES_PATH, 500, body));

    let report = loader_with(mock)
        .load_reports(&["sales"], &week())
        .await
        .unwrap();

    let sales = report.get("sales").unwrap();
    let prefix = "HTTP 500 (internal server error): ";
    let message = sales.error_message().unwrap();
    assert!(message.starts_with(prefix));
    assert_eq!(message.len(), prefix.len() + 512);
    assert_eq!(sales.http_status(), Some(500));
    assert_eq!(sales.failure_kind(), Some(FailureKind::ServerError(500)));
}

#[tokio::test]
async fn test_non_json_success_body_is_parse_failure() {
    let mock = Arc::new(MockApi::new().respond(ORDERS_PATH, 200, "<html>maintenance</html>"));

    let report = loader_with(mock)
        .load_reports(&["orders"], &week())
        .await
        .unwrap();

    let orders = report.get("orders").unwrap();
    assert_eq!(orders.failure_kind(), Some(FailureKind::ParseFailure));
    assert_eq!(orders.http_status(), None);
}

#[tokio::test]
async fn test_summary_over_mixed_results() {
    let mock = Arc::new(
        MockApi::new()
            .respond(SALES_PATH, 200, records_json(10))
            .respond(ORDERS_PATH, 200, records_json(5))
            .respond(STOCKS_PATH, 401, "unauthorized"),
    );

    let report = loader_with(mock)
        .load_reports(&["sales", "orders", "stocks"], &week())
        .await
        .unwrap();

    let summary = report::summarize(&report);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.total_records, 15);
}

#[tokio::test]
async fn test_outcome_hook_sees_every_outcome() {
    let mock = Arc::new(MockApi::new());
    let seen = Arc::new(AtomicUsize::new(0));
    let hook: OutcomeHook = {
        let seen = Arc::clone(&seen);
        Arc::new(move |_outcome: &wb_report_loader::FetchOutcome| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    };

    loader_with(mock)
        .with_outcome_hook(hook)
        .load_reports(&["sales", "orders", "incomes"], &week())
        .await
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 3);
}
