//! Persistence-side representations shared by repository implementations.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;

/// An outbox row ready to be written in the same transaction as the
/// aggregate change that produced it.
///
/// The synthetic row id, insertion time and `published_at` marker are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type tag for the downstream publisher.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// When the event occurred inside the aggregate.
    pub occurred_at: DateTime<Utc>,
}

impl OutboxRecord {
    /// Builds an outbox record from a drained domain event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload cannot be
    /// serialized. Callers inside a save transaction must abort on this error.
    pub fn from_event<E: DomainEvent>(event: &E) -> Result<Self, DomainError> {
        let payload = event.to_payload().map_err(|e| {
            DomainError::Infrastructure(format!(
                "serialize {} event payload: {e}",
                event.event_type()
            ))
        })?;

        Ok(Self {
            aggregate_id: event.aggregate_id(),
            event_type: event.event_type().to_owned(),
            payload,
            occurred_at: event.occurred_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::ser::Error as _;

    #[derive(Debug)]
    struct SampleEvent {
        id: Uuid,
        at: DateTime<Utc>,
        broken: bool,
    }

    impl DomainEvent for SampleEvent {
        fn event_type(&self) -> &'static str {
            "sample.happened"
        }

        fn aggregate_id(&self) -> Uuid {
            self.id
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }

        fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
            if self.broken {
                return Err(serde_json::Error::custom("unrepresentable"));
            }
            Ok(serde_json::json!({ "id": self.id }))
        }
    }

    #[test]
    fn test_from_event_copies_identity_type_and_time() {
        // Arrange
        let id = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let sample = SampleEvent {
            id,
            at,
            broken: false,
        };

        // Act
        let record = OutboxRecord::from_event(&sample).unwrap();

        // Assert
        assert_eq!(record.aggregate_id, id);
        assert_eq!(record.event_type, "sample.happened");
        assert_eq!(record.occurred_at, at);
        assert_eq!(record.payload, serde_json::json!({ "id": id }));
    }

    #[test]
    fn test_from_event_surfaces_serialization_failure_as_infrastructure() {
        let sample = SampleEvent {
            id: Uuid::new_v4(),
            at: Utc::now(),
            broken: true,
        };

        match OutboxRecord::from_event(&sample) {
            Err(DomainError::Infrastructure(msg)) => {
                assert!(msg.starts_with("serialize sample.happened event payload"));
            }
            other => panic!("expected Infrastructure, got {other:?}"),
        }
    }
}
