//! Payflow Idempotency: Redis implementation of the deduplication cache.

pub mod redis_store;

pub use redis_store::RedisIdempotencyStore;
