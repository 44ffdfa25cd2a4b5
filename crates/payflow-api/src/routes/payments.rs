//! Routes for the payments context.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router, routing::get, routing::post};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use payflow_payments::application::command_handlers::{self, InitiatePaymentResult};
use payflow_payments::application::query_handlers::{self, PaymentView};
use payflow_payments::domain::commands;
use payflow_payments::domain::value_objects::PaymentId;

use crate::error::ApiError;
use crate::extract::AppJson;
use crate::state::AppState;

/// Header that, when present, overrides the body's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Request body for POST /v1/payments.
///
/// Missing fields default to empty so they are reported as validation
/// errors. A body that is not JSON, or has a field of the wrong type, is
/// rejected as `invalid_json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InitiatePaymentRequest {
    /// The order being paid for.
    pub order_id: String,
    /// The paying customer.
    pub customer_id: String,
    /// Amount in minor units.
    pub amount_cents: i64,
    /// Three-letter currency code.
    pub currency: String,
    /// Deduplication token. The `Idempotency-Key` header takes precedence.
    pub idempotency_key: String,
}

/// POST /v1/payments
#[instrument(skip_all, fields(order_id = %request.order_id))]
async fn initiate_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(request): AppJson<InitiatePaymentRequest>,
) -> Result<(StatusCode, Json<InitiatePaymentResult>), ApiError> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map_or(request.idempotency_key, str::to_owned);

    let command = commands::InitiatePayment {
        correlation_id: Uuid::new_v4(),
        order_id: request.order_id,
        customer_id: request.customer_id,
        amount_minor: request.amount_cents,
        currency: request.currency,
        idempotency_key,
    };

    info!(correlation_id = %command.correlation_id, "handling initiate_payment command");

    let result = command_handlers::handle_initiate_payment(
        &command,
        state.clock.as_ref(),
        &*state.payment_repository,
        &*state.idempotency_store,
        &*state.telemetry,
        state.deadlines,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /v1/payments/{payment_id}
#[instrument(skip(state))]
async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<PaymentView>, ApiError> {
    let payment_id: PaymentId = payment_id.parse()?;
    let view = query_handlers::get_payment_by_id(payment_id, &*state.payment_repository).await?;
    Ok(Json(view))
}

/// Returns the router for the payments context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(initiate_payment))
        .route("/{payment_id}", get(get_payment))
}
