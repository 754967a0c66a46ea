//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bank_account::application::command_handlers::SnapshotPolicy;
use bank_account::domain::events::AccountEvent;
use bank_api::state::AppState;
use bank_core::config::EventStoreConfig;
use bank_core::log::EventLog;
use bank_core::repository::SnapshotStore;
use bank_event_store::LogEventStore;
use bank_test_support::FixedClock;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Replay tuning for logs whose polls never wait.
pub fn fast_config(partitions: u32) -> EventStoreConfig {
    EventStoreConfig {
        partitions,
        poll_timeout: Duration::from_millis(1),
        ..EventStoreConfig::default()
    }
}

/// Build the full app router over `log` and `snapshots` with a fixed clock.
/// Uses the same route structure as `main.rs`.
pub fn build_test_app(
    log: Arc<dyn EventLog>,
    snapshots: Arc<dyn SnapshotStore>,
    snapshot_policy: SnapshotPolicy,
) -> Router {
    let partitions = log.partition_count();
    let event_store = LogEventStore::<AccountEvent>::new(log, fast_config(partitions));
    let app_state = AppState::new(
        Arc::new(FixedClock::default()),
        Arc::new(event_store),
        snapshots,
        snapshot_policy,
    );
    bank_api::app(app_state)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
