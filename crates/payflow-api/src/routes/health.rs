//! Health check endpoints.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

const READINESS_TIMEOUT: Duration = Duration::from_secs(3);

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Probe response.
#[derive(Serialize)]
pub struct ProbeResponse {
    /// `ok` or `degraded`.
    pub status: &'static str,
    /// The first failing dependency, when degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /healthz/live
async fn liveness() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "ok",
        error: None,
    })
}

/// GET /healthz/ready
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ProbeResponse>) {
    match check_dependencies(&state).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ProbeResponse {
                status: "ok",
                error: None,
            }),
        ),
        Err(error) => {
            warn!(%error, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ProbeResponse {
                    status: "degraded",
                    error: Some(error),
                }),
            )
        }
    }
}

async fn check_dependencies(state: &AppState) -> Result<(), String> {
    let checks = async {
        state
            .payment_repository
            .ping()
            .await
            .map_err(|e| format!("database: {e}"))?;
        state
            .idempotency_store
            .ping()
            .await
            .map_err(|e| format!("cache: {e}"))
    };
    tokio::time::timeout(READINESS_TIMEOUT, checks)
        .await
        .map_err(|_| format!("dependencies did not answer within {READINESS_TIMEOUT:?}"))?
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz/live", get(liveness))
        .route("/healthz/ready", get(readiness))
}
