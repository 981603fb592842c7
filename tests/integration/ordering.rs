//! Integration tests for deterministic output ordering

use std::sync::Arc;
use std::time::Duration;

use crate::common::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_order_follows_request_when_first_is_slowest() {
    let mock = Arc::new(
        MockApi::new()
            .respond_after(SALES_PATH, 200, records_json(1), Duration::from_millis(200))
            .respond_after(ORDERS_PATH, 200, records_json(1), Duration::from_millis(20))
            .respond(STOCKS_PATH, 200, records_json(1)),
    );

    let report = loader_with(mock)
        .load_reports(&["sales", "orders", "stocks"], &week())
        .await
        .unwrap();

    let keys: Vec<&str> = report.outcomes().iter().map(|o| o.key()).collect();
    assert_eq!(keys, vec!["sales", "orders", "stocks"]);
    assert_eq!(report.requested_keys(), &["sales", "orders", "stocks"]);
}

#[tokio::test]
async fn test_order_is_stable_across_runs() {
    let keys = ["stocks", "balance", "sales", "incomes"];
    for _ in 0..5 {
        let mock = Arc::new(MockApi::new().with_latency(Duration::from_millis(5)));
        let report = loader_with(mock).load_reports(&keys, &week()).await.unwrap();
        let got: Vec<&str> = report.outcomes().iter().map(|o| o.key()).collect();
        assert_eq!(got, keys);
    }
}
