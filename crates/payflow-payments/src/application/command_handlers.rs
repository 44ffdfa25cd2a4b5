//! Command handlers for the payments context.
//!
//! `handle_initiate_payment` implements the idempotent initiation protocol:
//! validate, consult the deduplication cache, consult the authoritative
//! store, and only then create and persist a new aggregate. The cache is
//! never required for correctness; the store's unique idempotency-key
//! constraint is what guarantees at most one payment per key.

use std::future::Future;
use std::time::Duration;

use payflow_core::clock::Clock;
use payflow_core::command::Command;
use payflow_core::error::DomainError;
use payflow_core::idempotency::{CacheError, IDEMPOTENCY_TTL, IdempotencyStore};
use payflow_core::telemetry::{Signal, Telemetry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::aggregates::{Payment, PaymentStatus};
use crate::domain::commands::InitiatePayment;
use crate::domain::repository::PaymentRepository;
use crate::domain::value_objects::{Money, PaymentId};

/// Per-call deadlines for the collaborators of the initiation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// Bound on each cache call. Expiry is treated as a cache failure.
    pub cache: Duration,
    /// Bound on each store call. Expiry fails the request.
    pub store: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            cache: Duration::from_millis(500),
            store: Duration::from_secs(5),
        }
    }
}

/// Outcome of an initiation, as returned to callers and cached for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatePaymentResult {
    /// The payment identifier.
    pub payment_id: PaymentId,
    /// The payment status at the time the result was produced.
    pub status: PaymentStatus,
}

impl From<&Payment> for InitiatePaymentResult {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id(),
            status: payment.status(),
        }
    }
}

/// Handles the `InitiatePayment` command.
///
/// Repeating a command with the same idempotency key returns the result of
/// the first successful initiation, whether it is replayed from the cache,
/// found in the store, or created concurrently by another request.
///
/// # Errors
///
/// - `DomainError::Validation` for a malformed command; no collaborator is
///   touched in that case.
/// - `DomainError::Infrastructure` if the store fails or misses its deadline.
/// - Any other `DomainError` surfaced by the store unchanged.
#[instrument(
    skip_all,
    fields(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id,
        idempotency_key = command.idempotency_key().unwrap_or_default(),
    )
)]
pub async fn handle_initiate_payment(
    command: &InitiatePayment,
    clock: &dyn Clock,
    repo: &dyn PaymentRepository,
    cache: &dyn IdempotencyStore,
    telemetry: &dyn Telemetry,
    deadlines: Deadlines,
) -> Result<InitiatePaymentResult, DomainError> {
    let amount = validate(command)?;
    let key = command.idempotency_key.as_str();

    if let Some(result) = replay_from_cache(key, cache, telemetry, deadlines.cache).await {
        info!(payment_id = %result.payment_id, "idempotent replay from cache");
        return Ok(result);
    }

    let existing = within(
        deadlines.store,
        "idempotency key lookup",
        repo.find_by_idempotency_key(key),
    )
    .await?;
    if let Some(existing) = existing {
        let result = InitiatePaymentResult::from(&existing);
        telemetry.record(Signal::StoreReplay);
        info!(payment_id = %result.payment_id, "idempotent replay from store");
        remember(key, &result, cache, deadlines.cache).await;
        return Ok(result);
    }

    let mut payment = Payment::create(
        &command.order_id,
        &command.customer_id,
        amount,
        key,
        clock,
    )?;

    let committed = match within(deadlines.store, "save payment", repo.save(&mut payment)).await
    {
        Ok(records) => records,
        Err(DomainError::DuplicateIdempotencyKey(_)) => {
            return adopt_concurrent_winner(key, repo, cache, telemetry, deadlines).await;
        }
        Err(e) => return Err(e),
    };

    for record in &committed {
        debug!(
            payment_id = %record.aggregate_id,
            event_type = %record.event_type,
            "event committed to outbox"
        );
    }

    let result = InitiatePaymentResult::from(&payment);
    telemetry.record(Signal::PaymentCreated);
    remember(key, &result, cache, deadlines.cache).await;

    info!(
        payment_id = %result.payment_id,
        order_id = %command.order_id,
        customer_id = %command.customer_id,
        amount = %payment.amount(),
        "payment initiated"
    );

    Ok(result)
}

/// Checks the request shape and builds the money value up front so that a
/// malformed request never reaches the cache or the store.
fn validate(command: &InitiatePayment) -> Result<Money, DomainError> {
    if command.order_id.trim().is_empty() {
        return Err(DomainError::Validation("order_id is required".into()));
    }
    if command.customer_id.trim().is_empty() {
        return Err(DomainError::Validation("customer_id is required".into()));
    }
    if command.amount_minor <= 0 {
        return Err(DomainError::Validation(
            "amount must be a positive integer".into(),
        ));
    }
    if command.currency.trim().is_empty() {
        return Err(DomainError::Validation("currency is required".into()));
    }
    if command.idempotency_key.trim().is_empty() {
        return Err(DomainError::Validation("idempotency_key is required".into()));
    }
    Money::new(command.amount_minor, &command.currency)
}

/// Returns a cached result, or `None` on a miss, a cache failure, or a
/// corrupt entry. Never fails the request.
async fn replay_from_cache(
    key: &str,
    cache: &dyn IdempotencyStore,
    telemetry: &dyn Telemetry,
    deadline: Duration,
) -> Option<InitiatePaymentResult> {
    let decoded = match cache_call(deadline, cache.get(key)).await {
        Ok(Some(cached)) => {
            serde_json::from_str::<InitiatePaymentResult>(&cached).map_err(|e| e.to_string())
        }
        Ok(None) => return None,
        Err(CacheError::Corrupt(reason)) => Err(reason),
        Err(e) => {
            telemetry.record(Signal::CacheDegraded);
            warn!(error = %e, "idempotency cache unavailable, falling back to store");
            return None;
        }
    };

    match decoded {
        Ok(result) => {
            telemetry.record(Signal::CacheReplay);
            Some(result)
        }
        Err(reason) => {
            warn!(error = %reason, "corrupt idempotency cache entry, evicting");
            if let Err(e) = cache_call(deadline, cache.evict(key)).await {
                warn!(error = %e, "failed to evict corrupt idempotency cache entry");
            }
            None
        }
    }
}

/// Resolves a lost create-create race: the unique constraint rejected our
/// insert, so another request already stored a payment under this key.
async fn adopt_concurrent_winner(
    key: &str,
    repo: &dyn PaymentRepository,
    cache: &dyn IdempotencyStore,
    telemetry: &dyn Telemetry,
    deadlines: Deadlines,
) -> Result<InitiatePaymentResult, DomainError> {
    let winner = within(
        deadlines.store,
        "idempotency key re-fetch",
        repo.find_by_idempotency_key(key),
    )
    .await?
    .ok_or_else(|| {
        DomainError::Infrastructure(format!(
            "idempotency key {key:?} rejected as duplicate but no payment holds it"
        ))
    })?;

    let result = InitiatePaymentResult::from(&winner);
    telemetry.record(Signal::CreationRaceResolved);
    info!(payment_id = %result.payment_id, "concurrent duplicate resolved to existing payment");
    remember(key, &result, cache, deadlines.cache).await;
    Ok(result)
}

/// Best-effort write of `result` to the cache. Failures are logged only.
async fn remember(
    key: &str,
    result: &InitiatePaymentResult,
    cache: &dyn IdempotencyStore,
    deadline: Duration,
) {
    let serialized = match serde_json::to_string(result) {
        Ok(serialized) => serialized,
        Err(e) => {
            warn!(error = %e, "cannot serialize initiation result for caching");
            return;
        }
    };
    if let Err(e) = cache_call(deadline, cache.set(key, &serialized, IDEMPOTENCY_TTL)).await {
        warn!(error = %e, "failed to cache initiation result");
    }
}

async fn cache_call<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, CacheError>>,
) -> Result<T, CacheError> {
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| CacheError::Timeout(deadline))?
}

/// Bounds a store call by `deadline` and adds `operation` as context to
/// infrastructure failures. Domain outcomes pass through unchanged.
async fn within<T>(
    deadline: Duration,
    operation: &str,
    call: impl Future<Output = Result<T, DomainError>>,
) -> Result<T, DomainError> {
    match tokio::time::timeout(deadline, call).await {
        Ok(Err(DomainError::Infrastructure(msg))) => {
            Err(DomainError::Infrastructure(format!("{operation}: {msg}")))
        }
        Ok(outcome) => outcome,
        Err(_) => Err(DomainError::Infrastructure(format!(
            "{operation}: timed out after {deadline:?}"
        ))),
    }
}
