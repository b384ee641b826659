//! Integration tests for the operational HTTP surface
//!
//! Health, Prometheus metrics and the exchange clock.


use serde_json::Value;

use test_utils::TestApiServer;

const STATUSES: &[&str] = &[
    "call_auction",
    "morning_session",
    "afternoon_session",
    "lunch_break",
    "before_market",
    "after_market",
    "weekend_saturday",
    "weekend_sunday",
    "closed",
];

#[tokio::test]
async fn health_endpoint_reports_healthy_status() {
    let app = TestApiServer::new().await;
    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime_seconds"].as_u64().is_some());
    assert_eq!(body["service"], "tickwatch");
}

#[tokio::test]
async fn metrics_endpoint_exposes_pipeline_metrics() {
    let app = TestApiServer::new().await;
    let response = app.server.get("/metrics").await;
    assert_eq!(response.status_code(), 200);

    let body = response.text();
    for name in [
        "http_requests_total",
        "http_request_duration_seconds",
        "scan_cycles_total",
        "alarms_pushed_total",
        "notifications_sent_total",
    ] {
        assert!(body.contains(name), "Expected {} metric", name);
    }
}

#[tokio::test]
async fn metrics_middleware_counts_requests() {
    let app = TestApiServer::new().await;

    for _ in 0..3 {
        let _ = app.server.get("/health").await;
    }

    assert_eq!(app.metrics.http_requests_total.get(), 3.0);
    assert_eq!(app.metrics.http_requests_in_flight.get(), 0.0);
}

#[tokio::test]
async fn market_status_reports_exchange_clock() {
    let app = TestApiServer::new().await;
    let response = app.server.get("/api/market/status").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    let status = body["status"].as_str().expect("status string");
    assert!(STATUSES.contains(&status), "unexpected status {}", status);
    assert!(body["is_trading_day"].is_boolean());
    assert!(body["is_trading_time"].is_boolean());
    assert!(body["datetime"].as_str().unwrap().ends_with("+08:00"));
    assert!(!body["description"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = TestApiServer::new().await;
    let response = app.server.get("/api/unknown").await;
    assert_eq!(response.status_code(), 404);
}
