//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use payflow_api::state::AppState;
use payflow_core::clock::Clock;
use payflow_core::idempotency::IdempotencyStore;
use payflow_core::telemetry::Telemetry;
use payflow_payments::application::command_handlers::Deadlines;
use payflow_store::pg_payment_repository::PgPaymentRepository;
use payflow_test_support::{FixedClock, InMemoryIdempotencyStore, RecordingTelemetry};
use sqlx::PgPool;
use tower::ServiceExt;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app with a real `PgPaymentRepository`, an in-memory
/// cache, and a deterministic clock.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(
        pool,
        Arc::new(InMemoryIdempotencyStore::new()),
        Arc::new(RecordingTelemetry::new()),
    )
}

/// Build the full app with a caller-supplied cache and telemetry handle.
pub fn build_test_app_with(
    pool: PgPool,
    idempotency_store: Arc<dyn IdempotencyStore>,
    telemetry: Arc<dyn Telemetry>,
) -> Router {
    let app_state = AppState::new(
        fixed_clock(),
        Arc::new(PgPaymentRepository::new(pool)),
        idempotency_store,
        telemetry,
        Deadlines::default(),
    );
    payflow_api::app(app_state)
}

/// The canonical initiation body.
pub fn initiate_body(key: &str, amount_cents: i64, currency: &str) -> serde_json::Value {
    serde_json::json!({
        "order_id": "ORD-1",
        "customer_id": "CUST-1",
        "amount_cents": amount_cents,
        "currency": currency,
        "idempotency_key": key,
    })
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
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
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Number of payment rows holding `key`.
pub async fn payments_with_key(pool: &PgPool, key: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE idempotency_key = $1")
        .bind(key)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Event types written to the outbox for `payment_id`, oldest first.
pub async fn outbox_event_types(pool: &PgPool, payment_id: &str) -> Vec<String> {
    let payment_id = uuid::Uuid::parse_str(payment_id).unwrap();
    sqlx::query_scalar("SELECT event_type FROM outbox_events WHERE aggregate_id = $1 ORDER BY id")
        .bind(payment_id)
        .fetch_all(pool)
        .await
        .unwrap()
}
