//! `Redis` implementation of the `IdempotencyStore` trait.

use std::time::Duration;

use async_trait::async_trait;
use payflow_core::idempotency::{CacheError, IdempotencyStore};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, instrument};

/// Builds the cache key for an idempotency key under `namespace`.
#[must_use]
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{namespace}:idempotency:{key}")
}

fn unavailable(e: redis::RedisError) -> CacheError {
    CacheError::Unavailable(e.to_string())
}

fn decode_entry(bytes: Vec<u8>) -> Result<String, CacheError> {
    String::from_utf8(bytes).map_err(|e| CacheError::Corrupt(e.to_string()))
}

/// Redis-backed idempotency cache. Writes are `SET NX PX`, so the first
/// result stored under a key wins until it expires.
#[derive(Clone)]
pub struct RedisIdempotencyStore {
    conn: ConnectionManager,
    namespace: String,
}

impl std::fmt::Debug for RedisIdempotencyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisIdempotencyStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl RedisIdempotencyStore {
    /// Opens a managed, auto-reconnecting connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if the URL is invalid or the
    /// server cannot be reached.
    pub async fn connect(url: &str, namespace: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        Ok(Self {
            conn,
            namespace: namespace.to_owned(),
        })
    }

    fn key(&self, key: &str) -> String {
        namespaced_key(&self.namespace, key)
    }
}

#[async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(self.key(key)).await.map_err(unavailable)?;
        value.map(decode_entry).transpose()
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        if reply.is_none() {
            debug!("idempotency key already cached, keeping first result");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn evict(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _removed: u64 = conn.del(self.key(key)).await.map_err(unavailable)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
