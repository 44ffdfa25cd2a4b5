//! Injected observability handle.
//!
//! Counters are recorded through a `Telemetry` value that is constructed
//! once at startup and passed to the code that emits them. There is no
//! process-global registry.

/// Notable outcomes of the payment-initiation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The cache failed or timed out and the store was consulted instead.
    CacheDegraded,
    /// A request was answered from a cached result.
    CacheReplay,
    /// A request was answered from an aggregate already in the store.
    StoreReplay,
    /// A concurrent insert lost the uniqueness race and returned the winner.
    CreationRaceResolved,
    /// A new payment aggregate was persisted.
    PaymentCreated,
}

impl Signal {
    /// Stable label used as a metric attribute.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheDegraded => "cache_degraded",
            Self::CacheReplay => "cache_replay",
            Self::StoreReplay => "store_replay",
            Self::CreationRaceResolved => "creation_race_resolved",
            Self::PaymentCreated => "payment_created",
        }
    }
}

/// Sink for protocol signals.
pub trait Telemetry: Send + Sync {
    /// Records one occurrence of `signal`.
    fn record(&self, signal: Signal);
}

/// Telemetry that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _signal: Signal) {}
}
