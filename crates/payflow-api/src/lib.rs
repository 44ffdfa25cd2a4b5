//! Payflow API: HTTP front end for the payment service.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::config::HttpConfig;
use crate::middleware::RequestMetrics;
use crate::state::AppState;
use crate::telemetry::OtelRequestMetrics;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builds the full application router with default limits, recording
/// request metrics on the global meter.
pub fn app(state: AppState) -> Router {
    app_with(
        state,
        &HttpConfig::default(),
        Arc::new(OtelRequestMetrics::new()),
    )
}

/// Builds the full application router.
pub fn app_with(state: AppState, http: &HttpConfig, metrics: Arc<dyn RequestMetrics>) -> Router {
    let router = Router::new()
        .merge(routes::health::router())
        .nest("/v1/payments", routes::payments::router())
        .with_state(state);
    with_http_layers(router, http, metrics)
}

/// Wraps `router` in the server middleware. From the outside in: request id
/// assignment, tracing, request id echo, CORS, metrics, panic recovery, and
/// the request and body deadlines.
pub fn with_http_layers(
    router: Router,
    http: &HttpConfig,
    metrics: Arc<dyn RequestMetrics>,
) -> Router {
    // TODO: restrict CORS origins once the allowed front-end hosts are known.
    router
        .layer(RequestBodyTimeoutLayer::new(http.read_timeout))
        .layer(TimeoutLayer::new(http.request_timeout))
        .layer(CatchPanicLayer::custom(middleware::panic_response))
        .layer(axum::middleware::from_fn_with_state(
            metrics,
            middleware::track_requests,
        ))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
    )
}
