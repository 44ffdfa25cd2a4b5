//! Shared application state.

use std::sync::Arc;

use payflow_core::clock::Clock;
use payflow_core::idempotency::IdempotencyStore;
use payflow_core::telemetry::Telemetry;
use payflow_payments::application::command_handlers::Deadlines;
use payflow_payments::domain::repository::PaymentRepository;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for timestamping new payments.
    pub clock: Arc<dyn Clock>,
    /// Authoritative payment storage.
    pub payment_repository: Arc<dyn PaymentRepository>,
    /// Best-effort deduplication cache.
    pub idempotency_store: Arc<dyn IdempotencyStore>,
    /// Initiation outcome counters.
    pub telemetry: Arc<dyn Telemetry>,
    /// Per-call cache and store deadlines.
    pub deadlines: Deadlines,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        payment_repository: Arc<dyn PaymentRepository>,
        idempotency_store: Arc<dyn IdempotencyStore>,
        telemetry: Arc<dyn Telemetry>,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            clock,
            payment_repository,
            idempotency_store,
            telemetry,
            deadlines,
        }
    }
}
