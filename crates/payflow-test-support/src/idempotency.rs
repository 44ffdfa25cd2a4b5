//! Test caches: `IdempotencyStore` implementations for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use payflow_core::clock::{Clock, SystemClock};
use payflow_core::idempotency::{CacheError, IdempotencyStore};

/// An in-memory cache with set-if-absent writes and TTL expiry measured
/// against an injectable clock.
pub struct InMemoryIdempotencyStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
    clock: Arc<dyn Clock>,
    calls: AtomicUsize,
}

impl std::fmt::Debug for InMemoryIdempotencyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIdempotencyStore")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl InMemoryIdempotencyStore {
    /// Creates an empty cache driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache driven by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            calls: AtomicUsize::new(0),
        }
    }

    /// Writes `value` unconditionally with a day-long expiry. Used to seed
    /// hits and corrupt entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert_raw(&self, key: &str, value: &str) {
        let expires_at = self.clock.now() + chrono::Duration::days(1);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), (value.to_owned(), expires_at));
    }

    /// Returns the live value stored for `key` without counting a call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn peek(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone())
    }

    /// Number of trait calls served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= now => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CacheError::Unavailable(format!("invalid ttl: {e}")))?;
        let mut entries = self.entries.lock().unwrap();
        let live = entries
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at > now);
        if !live {
            entries.insert(key.to_owned(), (value.to_owned(), now + ttl));
        }
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<(), CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// A cache that is permanently unreachable.
#[derive(Debug)]
pub struct UnavailableIdempotencyStore;

#[async_trait]
impl IdempotencyStore for UnavailableIdempotencyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn evict(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

/// A cache whose calls never complete. Exercises caller deadlines.
#[derive(Debug)]
pub struct HangingIdempotencyStore;

#[async_trait]
impl IdempotencyStore for HangingIdempotencyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        std::future::pending().await
    }

    async fn evict(&self, _key: &str) -> Result<(), CacheError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        std::future::pending().await
    }
}
