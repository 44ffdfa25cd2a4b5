//! Aggregate roots for the payments context.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use payflow_core::aggregate::AggregateRoot;
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    PaymentCompleted, PaymentEvent, PaymentFailed, PaymentInitiated, PaymentProcessingStarted,
};
use super::value_objects::{Money, PaymentId};

/// Lifecycle status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Recorded, not yet sent to a provider.
    Pending,
    /// Accepted by a provider, awaiting outcome.
    Processing,
    /// Terminal: money moved.
    Completed,
    /// Terminal: provider rejected the payment.
    Failed,
}

impl PaymentStatus {
    /// Storage and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether the state machine has an edge from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed | Self::Failed)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(DomainError::Validation(format!(
                "unknown payment status: {other:?}"
            ))),
        }
    }
}

/// Persisted state of a payment, as read back from storage.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    /// Identifier.
    pub id: PaymentId,
    /// Order reference.
    pub order_id: String,
    /// Customer reference.
    pub customer_id: String,
    /// Amount and currency.
    pub amount: Money,
    /// Status.
    pub status: PaymentStatus,
    /// Provider reference, empty until processing starts.
    pub provider_ref: String,
    /// Failure reason, empty unless failed.
    pub failure_reason: String,
    /// Idempotency key the payment was created under.
    pub idempotency_key: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Stored version.
    pub version: i64,
}

/// The aggregate root for a payment.
#[derive(Debug)]
pub struct Payment {
    id: PaymentId,
    order_id: String,
    customer_id: String,
    amount: Money,
    status: PaymentStatus,
    provider_ref: String,
    failure_reason: String,
    idempotency_key: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
    /// Whether `version` already counts the changes buffered since the last
    /// drain.
    version_advanced: bool,
    pending_events: Vec<PaymentEvent>,
}

impl Payment {
    /// Creates a new pending payment and buffers a `payment.initiated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the order id, customer id or
    /// idempotency key is blank.
    pub fn create(
        order_id: &str,
        customer_id: &str,
        amount: Money,
        idempotency_key: &str,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        require_present("order_id", order_id)?;
        require_present("customer_id", customer_id)?;
        require_present("idempotency_key", idempotency_key)?;

        let now = clock.now();
        let id = PaymentId::generate();
        let initiated = PaymentInitiated {
            payment_id: id.as_uuid(),
            order_id: order_id.to_owned(),
            amount: amount.amount(),
            currency: amount.currency().to_owned(),
            occurred_at: now,
        };

        Ok(Self {
            id,
            order_id: order_id.to_owned(),
            customer_id: customer_id.to_owned(),
            amount,
            status: PaymentStatus::Pending,
            provider_ref: String::new(),
            failure_reason: String::new(),
            idempotency_key: idempotency_key.to_owned(),
            created_at: now,
            updated_at: now,
            version: 1,
            version_advanced: true,
            pending_events: vec![PaymentEvent::Initiated(initiated)],
        })
    }

    /// Rehydrates a payment from storage. Performs no validation and buffers
    /// no events.
    #[must_use]
    pub fn reconstitute(record: PaymentRecord) -> Self {
        Self {
            id: record.id,
            order_id: record.order_id,
            customer_id: record.customer_id,
            amount: record.amount,
            status: record.status,
            provider_ref: record.provider_ref,
            failure_reason: record.failure_reason,
            idempotency_key: record.idempotency_key,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            version_advanced: false,
            pending_events: Vec::new(),
        }
    }

    /// Snapshot of the persistable state, without the event buffer.
    #[must_use]
    pub fn to_record(&self) -> PaymentRecord {
        PaymentRecord {
            id: self.id,
            order_id: self.order_id.clone(),
            customer_id: self.customer_id.clone(),
            amount: self.amount.clone(),
            status: self.status,
            provider_ref: self.provider_ref.clone(),
            failure_reason: self.failure_reason.clone(),
            idempotency_key: self.idempotency_key.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }

    /// Moves a pending payment into processing at a provider.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank provider reference and
    /// `DomainError::InvalidTransition` unless the payment is pending.
    pub fn start_processing(
        &mut self,
        provider_ref: &str,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        require_present("provider_ref", provider_ref)?;
        let now = self.transition(PaymentStatus::Processing, clock)?;
        self.provider_ref = provider_ref.to_owned();
        self.pending_events
            .push(PaymentEvent::ProcessingStarted(PaymentProcessingStarted {
                payment_id: self.id.as_uuid(),
                provider_ref: provider_ref.to_owned(),
                occurred_at: now,
            }));
        Ok(())
    }

    /// Marks a processing payment as completed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless the payment is processing.
    pub fn complete(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        let now = self.transition(PaymentStatus::Completed, clock)?;
        self.pending_events
            .push(PaymentEvent::Completed(PaymentCompleted {
                payment_id: self.id.as_uuid(),
                occurred_at: now,
            }));
        Ok(())
    }

    /// Marks a processing payment as failed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank reason and
    /// `DomainError::InvalidTransition` unless the payment is processing.
    pub fn fail(&mut self, reason: &str, clock: &dyn Clock) -> Result<(), DomainError> {
        require_present("reason", reason)?;
        let now = self.transition(PaymentStatus::Failed, clock)?;
        self.failure_reason = reason.to_owned();
        self.pending_events.push(PaymentEvent::Failed(PaymentFailed {
            payment_id: self.id.as_uuid(),
            reason: reason.to_owned(),
            occurred_at: now,
        }));
        Ok(())
    }

    fn transition(
        &mut self,
        next: PaymentStatus,
        clock: &dyn Clock,
    ) -> Result<DateTime<Utc>, DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        let now = clock.now();
        self.status = next;
        self.updated_at = now;
        if !self.version_advanced {
            self.version += 1;
            self.version_advanced = true;
        }
        Ok(now)
    }

    /// Identifier.
    #[must_use]
    pub fn id(&self) -> PaymentId {
        self.id
    }

    /// Order reference.
    #[must_use]
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Customer reference.
    #[must_use]
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// Amount and currency.
    #[must_use]
    pub fn amount(&self) -> &Money {
        &self.amount
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    /// Provider reference (empty until processing starts).
    #[must_use]
    pub fn provider_ref(&self) -> &str {
        &self.provider_ref
    }

    /// Failure reason (empty unless failed).
    #[must_use]
    pub fn failure_reason(&self) -> &str {
        &self.failure_reason
    }

    /// Idempotency key.
    #[must_use]
    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    /// Creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last update time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl AggregateRoot for Payment {
    type Event = PaymentEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn pending_events(&self) -> &[Self::Event] {
        &self.pending_events
    }

    fn drain_events(&mut self) -> Vec<Self::Event> {
        self.version_advanced = false;
        std::mem::take(&mut self.pending_events)
    }
}

fn require_present(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use payflow_core::event::DomainEvent;
    use payflow_test_support::FixedClock;

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn usd(amount: i64) -> Money {
        Money::new(amount, "USD").unwrap()
    }

    fn new_payment(clock: &FixedClock) -> Payment {
        Payment::create("ORD-1", "CUST-1", usd(1000), "K1", clock).unwrap()
    }

    #[test]
    fn test_create_produces_pending_payment_at_version_one() {
        // Arrange
        let clock = fixed_clock();

        // Act
        let payment = new_payment(&clock);

        // Assert
        assert_eq!(payment.status(), PaymentStatus::Pending);
        assert_eq!(payment.version(), 1);
        assert_eq!(payment.order_id(), "ORD-1");
        assert_eq!(payment.customer_id(), "CUST-1");
        assert_eq!(payment.idempotency_key(), "K1");
        assert_eq!(payment.amount(), &usd(1000));
        assert_eq!(payment.created_at(), clock.0);
        assert_eq!(payment.updated_at(), clock.0);
        assert!(payment.provider_ref().is_empty());
        assert!(payment.failure_reason().is_empty());
    }

    #[test]
    fn test_create_buffers_exactly_one_initiated_event() {
        let clock = fixed_clock();
        let payment = new_payment(&clock);

        let events = payment.pending_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "payment.initiated");
        assert_eq!(events[0].aggregate_id(), payment.id().as_uuid());
        match &events[0] {
            PaymentEvent::Initiated(e) => {
                assert_eq!(e.order_id, "ORD-1");
                assert_eq!(e.amount, 1000);
                assert_eq!(e.currency, "USD");
                assert_eq!(e.occurred_at, clock.0);
            }
            other => panic!("expected Initiated, got {other:?}"),
        }
    }

    #[test]
    fn test_create_assigns_distinct_identifiers() {
        let clock = fixed_clock();
        let a = new_payment(&clock);
        let b = new_payment(&clock);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_create_rejects_blank_fields() {
        let clock = fixed_clock();
        let cases = [
            ("", "CUST-1", "K1", "order_id is required"),
            ("ORD-1", "  ", "K1", "customer_id is required"),
            ("ORD-1", "CUST-1", "", "idempotency_key is required"),
        ];

        for (order, customer, key, expected) in cases {
            match Payment::create(order, customer, usd(1), key, &clock) {
                Err(DomainError::Validation(msg)) => assert_eq!(msg, expected),
                other => panic!("expected Validation, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_drain_events_empties_buffer() {
        let clock = fixed_clock();
        let mut payment = new_payment(&clock);

        let first = payment.drain_events();
        let second = payment.drain_events();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert!(payment.pending_events().is_empty());
    }

    #[test]
    fn test_reconstitute_buffers_no_events() {
        let clock = fixed_clock();
        let record = PaymentRecord {
            id: PaymentId::generate(),
            order_id: "ORD-9".to_owned(),
            customer_id: "CUST-9".to_owned(),
            amount: usd(42),
            status: PaymentStatus::Processing,
            provider_ref: "prov-1".to_owned(),
            failure_reason: String::new(),
            idempotency_key: "K9".to_owned(),
            created_at: clock.0,
            updated_at: clock.0,
            version: 7,
        };

        let mut payment = Payment::reconstitute(record.clone());

        assert_eq!(payment.id(), record.id);
        assert_eq!(payment.status(), PaymentStatus::Processing);
        assert_eq!(payment.version(), 7);
        assert!(payment.drain_events().is_empty());
    }

    #[test]
    fn test_transition_after_drain_advances_version_once() {
        // Arrange
        let clock = fixed_clock();
        let mut payment = new_payment(&clock);
        payment.drain_events();

        // Act
        payment.start_processing("prov-123", &clock).unwrap();
        payment.complete(&clock).unwrap();

        // Assert
        assert_eq!(payment.version(), 2);
        assert_eq!(payment.status(), PaymentStatus::Completed);
        assert_eq!(payment.provider_ref(), "prov-123");
        let types: Vec<_> = payment
            .pending_events()
            .iter()
            .map(DomainEvent::event_type)
            .collect();
        assert_eq!(types, ["payment.processing_started", "payment.completed"]);
    }

    #[test]
    fn test_transition_before_first_drain_keeps_creation_version() {
        let clock = fixed_clock();
        let mut payment = new_payment(&clock);

        payment.start_processing("prov-1", &clock).unwrap();

        assert_eq!(payment.version(), 1);
        assert_eq!(payment.pending_events().len(), 2);
    }

    #[test]
    fn test_fail_records_reason() {
        let clock = fixed_clock();
        let mut payment = new_payment(&clock);
        payment.start_processing("prov-1", &clock).unwrap();

        payment.fail("card declined", &clock).unwrap();

        assert_eq!(payment.status(), PaymentStatus::Failed);
        assert_eq!(payment.failure_reason(), "card declined");
    }

    #[test]
    fn test_invalid_transitions_are_rejected_without_side_effects() {
        let clock = fixed_clock();
        let mut payment = new_payment(&clock);
        payment.drain_events();

        match payment.complete(&clock) {
            Err(DomainError::InvalidTransition { from, to }) => {
                assert_eq!(from, "PENDING");
                assert_eq!(to, "COMPLETED");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(payment.status(), PaymentStatus::Pending);
        assert_eq!(payment.version(), 1);
        assert!(payment.pending_events().is_empty());
    }

    #[test]
    fn test_terminal_states_have_no_outgoing_edges() {
        use PaymentStatus::{Completed, Failed, Pending, Processing};
        let all = [Pending, Processing, Completed, Failed];
        for next in all {
            assert!(!Completed.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
        assert!(Pending.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn test_status_text_round_trip_and_serde_form() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Processing,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_owned())
            );
        }
        assert!("pending".parse::<PaymentStatus>().is_err());
    }
}
