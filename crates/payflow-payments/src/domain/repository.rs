//! Persistence port for payment aggregates.

use async_trait::async_trait;
use payflow_core::aggregate::AggregateRoot;
use payflow_core::error::DomainError;
use payflow_core::repository::OutboxRecord;

use super::aggregates::Payment;
use super::value_objects::PaymentId;

/// Authoritative storage for payments with optimistic concurrency and an
/// embedded transactional outbox.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Upserts `payment` and writes one outbox row per buffered event in a
    /// single atomic unit, returning the rows written.
    ///
    /// The event buffer is drained only after the write commits. A failed
    /// save leaves the buffer and the version untouched, so retrying the same
    /// aggregate writes the same outbox rows. An update is accepted only when
    /// the stored version equals `payment.version() - 1`.
    ///
    /// # Errors
    ///
    /// - `DomainError::VersionConflict` if another writer advanced the version.
    /// - `DomainError::DuplicateIdempotencyKey` if a different payment already
    ///   holds the idempotency key.
    /// - `DomainError::Infrastructure` for any other store failure, including
    ///   a failed outbox write (which rolls back the state change too).
    async fn save(&self, payment: &mut Payment) -> Result<Vec<OutboxRecord>, DomainError>;

    /// Strongly consistent lookup by idempotency key.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store cannot be queried.
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Payment>, DomainError>;

    /// Loads a payment by identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if no payment has this id and
    /// `DomainError::Infrastructure` if the store cannot be queried.
    async fn find_by_id(&self, id: PaymentId) -> Result<Payment, DomainError>;

    /// Confirms the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if it is not.
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Converts the payment's buffered events to outbox rows without consuming
/// them.
///
/// Repository implementations call this before writing, so a serialization
/// failure aborts the save before anything is stored, and call
/// `drain_events` once the write has committed.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if an event payload cannot be
/// serialized.
pub fn outbox_records(payment: &Payment) -> Result<Vec<OutboxRecord>, DomainError> {
    payment
        .pending_events()
        .iter()
        .map(OutboxRecord::from_event)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Money;
    use chrono::{TimeZone, Utc};
    use payflow_test_support::FixedClock;

    #[test]
    fn test_outbox_records_leave_the_buffer_intact() {
        // Arrange
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
        let money = Money::new(1000, "USD").unwrap();
        let mut payment = Payment::create("ORD-1", "CUST-1", money, "K1", &clock).unwrap();

        // Act
        let records = outbox_records(&payment).unwrap();
        let again = outbox_records(&payment).unwrap();
        payment.drain_events();
        let drained = outbox_records(&payment).unwrap();

        // Assert
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_type, "payment.initiated");
        assert_eq!(records[0].aggregate_id, payment.id().as_uuid());
        assert_eq!(records[0].occurred_at, clock.0);
        assert_eq!(records[0].payload["order_id"], "ORD-1");
        assert_eq!(again, records);
        assert!(drained.is_empty());
    }
}
