//! HTTP middleware: per-route request metrics and panic responses.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use payflow_core::error::DomainError;

use crate::error::ApiError;

/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "unknown";

/// Sink for per-request HTTP measurements.
pub trait RequestMetrics: Send + Sync {
    /// Records one finished request. `route` is the matched route template,
    /// not the concrete path, so ids do not explode label cardinality.
    fn record(&self, method: &Method, route: &str, status: StatusCode, elapsed: Duration);
}

/// Counts and times every request that passes through it.
pub async fn track_requests(
    State(metrics): State<Arc<dyn RequestMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_owned(), |path| path.as_str().to_owned());

    let response = next.run(request).await;
    metrics.record(&method, &route, response.status(), started.elapsed());
    response
}

/// Turns a handler panic into a `500 internal_error` body.
#[allow(clippy::needless_pass_by_value)]
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    ApiError::Domain(DomainError::Infrastructure(format!(
        "request handler panicked: {detail}"
    )))
    .into_response()
}
