//! Shared test doubles and utilities for the payflow payment service.

mod clock;
mod idempotency;
mod repository;
mod telemetry;

pub use clock::{FixedClock, SteppingClock};
pub use idempotency::{
    HangingIdempotencyStore, InMemoryIdempotencyStore, UnavailableIdempotencyStore,
};
pub use repository::{
    FailingPaymentRepository, HangingPaymentRepository, InMemoryPaymentRepository,
};
pub use telemetry::RecordingTelemetry;
