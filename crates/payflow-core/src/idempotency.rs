//! Deduplication cache contract.
//!
//! The cache is an optimization in front of the authoritative store. A miss
//! is `Ok(None)`; an unreachable or slow cache is a `CacheError`, which
//! callers treat as a reason to fall back to the store rather than as
//! "not found".

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// How long a cached initiation result is kept.
pub const IDEMPOTENCY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Failures of the deduplication cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be reached or rejected the command.
    #[error("idempotency cache unavailable: {0}")]
    Unavailable(String),

    /// The stored value cannot be decoded. Callers treat it like an
    /// unparseable entry: a miss that should be evicted.
    #[error("corrupt idempotency cache entry: {0}")]
    Corrupt(String),

    /// The call did not finish within its deadline.
    #[error("idempotency cache call timed out after {0:?}")]
    Timeout(Duration),
}

/// Key → serialized result store with TTL and first-writer-wins writes.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Returns the cached value for `key`, or `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` if no value is present yet. Losing the
    /// race to another writer is a successful no-op.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Removes the entry for `key`, if any.
    async fn evict(&self, key: &str) -> Result<(), CacheError>;

    /// Confirms the cache is reachable.
    async fn ping(&self) -> Result<(), CacheError>;
}
