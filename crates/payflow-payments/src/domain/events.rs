//! Domain events for the payments context.

use chrono::{DateTime, Utc};
use payflow_core::event::DomainEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted when a payment is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiated {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// The order being paid for.
    pub order_id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// When the payment was created.
    pub occurred_at: DateTime<Utc>,
}

/// Emitted when a provider accepts the payment for processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProcessingStarted {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// Provider-side transaction reference.
    pub provider_ref: String,
    /// When processing began.
    pub occurred_at: DateTime<Utc>,
}

/// Emitted when the provider confirms the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCompleted {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// When the payment completed.
    pub occurred_at: DateTime<Utc>,
}

/// Emitted when the provider rejects the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailed {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// Why the payment failed.
    pub reason: String,
    /// When the payment failed.
    pub occurred_at: DateTime<Utc>,
}

/// Events produced by the `Payment` aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// A payment has been initiated.
    Initiated(PaymentInitiated),
    /// Processing has started at the provider.
    ProcessingStarted(PaymentProcessingStarted),
    /// The payment completed.
    Completed(PaymentCompleted),
    /// The payment failed.
    Failed(PaymentFailed),
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Initiated(_) => "payment.initiated",
            Self::ProcessingStarted(_) => "payment.processing_started",
            Self::Completed(_) => "payment.completed",
            Self::Failed(_) => "payment.failed",
        }
    }

    fn aggregate_id(&self) -> Uuid {
        match self {
            Self::Initiated(e) => e.payment_id,
            Self::ProcessingStarted(e) => e.payment_id,
            Self::Completed(e) => e.payment_id,
            Self::Failed(e) => e.payment_id,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Initiated(e) => e.occurred_at,
            Self::ProcessingStarted(e) => e.occurred_at,
            Self::Completed(e) => e.occurred_at,
            Self::Failed(e) => e.occurred_at,
        }
    }

    // The event type travels in its own outbox column, so the payload is
    // the bare fact without an enum tag.
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Initiated(e) => serde_json::to_value(e),
            Self::ProcessingStarted(e) => serde_json::to_value(e),
            Self::Completed(e) => serde_json::to_value(e),
            Self::Failed(e) => serde_json::to_value(e),
        }
    }
}
