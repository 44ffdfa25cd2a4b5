//! API error types and their HTTP mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use payflow_core::error::DomainError;
use payflow_core::idempotency::CacheError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migrations could not be applied.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The idempotency cache could not be reached.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Tracing or metrics export could not be set up.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// Errors a handler can answer with.
#[derive(Debug)]
pub enum ApiError {
    /// A domain or infrastructure failure from the application layer.
    Domain(DomainError),
    /// The request body is not JSON of the expected shape.
    InvalidJson(JsonRejection),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidJson(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Domain(err) => domain_error_response(&err),
            Self::InvalidJson(rejection) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: "invalid_json",
                    message: format!("cannot parse request body: {}", rejection.body_text()),
                }),
            )
                .into_response(),
        }
    }
}

fn domain_error_response(err: &DomainError) -> Response {
    let (status, error_code) = match err {
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::AggregateNotFound(_) => (StatusCode::NOT_FOUND, "payment_not_found"),
        DomainError::VersionConflict { .. } => (StatusCode::CONFLICT, "version_conflict"),
        DomainError::DuplicateIdempotencyKey(_) => {
            (StatusCode::CONFLICT, "duplicate_idempotency_key")
        }
        DomainError::InvalidTransition { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_state_transition",
        ),
        DomainError::Infrastructure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "unhandled error in HTTP handler");
        "an unexpected error occurred".to_owned()
    } else {
        err.to_string()
    };

    let body = Json(ErrorBody {
        error: error_code,
        message,
    });

    if err.is_retryable() {
        (status, [(header::RETRY_AFTER, "1")], body).into_response()
    } else {
        (status, body).into_response()
    }
}
