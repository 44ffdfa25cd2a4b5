//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for state-stored aggregate roots that buffer the events produced
/// by their own mutations until the next persistence cycle.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version. Starts at 1 on creation and grows by one
    /// per persistence cycle that changed state.
    fn version(&self) -> i64;

    /// Returns buffered events without consuming them.
    fn pending_events(&self) -> &[Self::Event];

    /// Takes the buffered events, leaving the buffer empty.
    ///
    /// Must be called at most once per persistence cycle. A second call
    /// without an intervening mutation returns an empty vector.
    fn drain_events(&mut self) -> Vec<Self::Event>;
}
