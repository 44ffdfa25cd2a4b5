//! Domain event abstractions.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Trait that all domain events implement.
///
/// Events are immutable snapshots produced by an aggregate's own mutating
/// operations. They are never constructed by application code.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type tag (e.g. `payment.initiated`), stored
    /// alongside the payload in the outbox.
    fn event_type(&self) -> &'static str;

    /// Aggregate this event belongs to.
    fn aggregate_id(&self) -> Uuid;

    /// When the fact recorded by this event happened.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Serializes the event payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the payload cannot be
    /// represented as JSON.
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;
}
