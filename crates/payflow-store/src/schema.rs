//! Payment store schema names.
//!
//! The DDL lives in the workspace `migrations/` directory.

/// Unique constraint guarding one payment per idempotency key.
pub const IDEMPOTENCY_KEY_CONSTRAINT: &str = "payments_idempotency_key_unique";
