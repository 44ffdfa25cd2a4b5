//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or missing input.
    #[error("validation error: {0}")]
    Validation(String),

    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict: another writer already advanced the
    /// stored version past `attempted_version - 1`.
    #[error("version conflict on aggregate {aggregate_id}: attempted to write version {attempted_version}")]
    VersionConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The version the rejected write tried to store.
        attempted_version: i64,
    },

    /// A status change that does not follow the state machine edges.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// The unique constraint on the idempotency key rejected an insert.
    #[error("idempotency key already in use: {0}")]
    DuplicateIdempotencyKey(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` when the caller may re-read and retry the operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_version_conflict_is_retryable() {
        let conflict = DomainError::VersionConflict {
            aggregate_id: Uuid::new_v4(),
            attempted_version: 2,
        };
        assert!(conflict.is_retryable());
        assert!(!DomainError::Validation("bad".into()).is_retryable());
        assert!(!DomainError::Infrastructure("down".into()).is_retryable());
        assert!(!DomainError::AggregateNotFound(Uuid::new_v4()).is_retryable());
    }

    #[test]
    fn test_version_conflict_message_names_aggregate_and_version() {
        let id = Uuid::new_v4();
        let err = DomainError::VersionConflict {
            aggregate_id: id,
            attempted_version: 3,
        };
        assert_eq!(
            err.to_string(),
            format!("version conflict on aggregate {id}: attempted to write version 3")
        );
    }
}
