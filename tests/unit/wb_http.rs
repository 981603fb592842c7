//! Unit tests for the reqwest-backed request capability

use httpmock::prelude::*;
use std::time::Duration;
use wb_report_loader::fetcher::wb_http::WbHttpClient;
use wb_report_loader::fetcher::{ApiRequest, ApiResponse, RequestCapability, TransportError};

use crate::common::*;

fn query() -> Vec<(String, String)> {
    vec![
        ("dateFrom".to_string(), "2025-10-13T00:00:00Z".to_string()),
        ("limit".to_string(), "10".to_string()),
    ]
}

async fn get(
    client: &WbHttpClient,
    url: &str,
    query: &[(String, String)],
    token: &str,
) -> Result<ApiResponse, TransportError> {
    client
        .get(ApiRequest {
            url,
            query,
            auth_token: token,
            timeout: Duration::from_secs(5),
        })
        .await
}

#[tokio::test]
async fn test_sends_bearer_token_and_json_content_type() {
    let server = MockServer::start_async().await;
    let sales = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(SALES_PATH)
                .query_param("dateFrom", "2025-10-13T00:00:00Z")
                .query_param("limit", "10")
                .header("authorization", "Bearer secret-key")
                .header("content-type", "application/json")
                .header_exists("user-agent");
            then.status(200).body(r#"[{"id":1}]"#);
        })
        .await;

    let client = WbHttpClient::new().unwrap();
    let response = get(&client, &server.url(SALES_PATH), &query(), "secret-key")
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#"[{"id":1}]"#);
    sales.assert_async().await;
}

#[tokio::test]
async fn test_non_success_status_is_returned_not_raised() {
    let server = MockServer::start_async().await;
    let missing = server
        .mock_async(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not found");
        })
        .await;

    let client = WbHttpClient::new().unwrap();
    let response = get(&client, &server.url("/missing"), &[], "k").await.unwrap();

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
    assert_eq!(response.body, "not found");
    missing.assert_async().await;
}

#[tokio::test]
async fn test_retries_server_errors_when_enabled() {
    let server = MockServer::start_async().await;
    let busy = server
        .mock_async(|when, then| {
            when.method(GET).path(ORDERS_PATH);
            then.status(503).body("busy");
        })
        .await;

    let client = WbHttpClient::new().unwrap().with_max_retries(1);
    let response = get(&client, &server.url(ORDERS_PATH), &[], "k").await.unwrap();

    // The last attempt's response is handed back once retries run out
    assert_eq!(response.status, 503);
    assert_eq!(busy.hits_async().await, 2);
}

#[tokio::test]
async fn test_server_errors_not_retried_by_default() {
    let server = MockServer::start_async().await;
    let busy = server
        .mock_async(|when, then| {
            when.method(GET).path(ORDERS_PATH);
            then.status(503).body("busy");
        })
        .await;

    let client = WbHttpClient::new().unwrap();
    let response = get(&client, &server.url(ORDERS_PATH), &[], "k").await.unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(busy.hits_async().await, 1);
}

#[tokio::test]
async fn test_auth_failures_are_not_retried() {
    let server = MockServer::start_async().await;
    let denied = server
        .mock_async(|when, then| {
            when.method(GET).path(STOCKS_PATH);
            then.status(401).body("unauthorized");
        })
        .await;

    let client = WbHttpClient::new().unwrap().with_max_retries(3);
    let response = get(&client, &server.url(STOCKS_PATH), &[], "bad").await.unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(denied.hits_async().await, 1);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(SALES_PATH);
            then.status(200).body("[]").delay(Duration::from_secs(3));
        })
        .await;

    let client = WbHttpClient::new().unwrap();
    let url = server.url(SALES_PATH);
    let err = client
        .get(ApiRequest {
            url: &url,
            query: &[],
            auth_token: "k",
            timeout: Duration::from_millis(200),
        })
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::Timeout(Duration::from_millis(200)));
}

#[tokio::test]
async fn test_connection_refused_is_classified() {
    // Bind then drop to get a port nothing listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = WbHttpClient::new().unwrap();
    let url = format!("http://127.0.0.1:{port}/api");

    let err = get(&client, &url, &[], "k").await.unwrap_err();

    assert!(matches!(err, TransportError::Connect(_)), "{err:?}");
}
