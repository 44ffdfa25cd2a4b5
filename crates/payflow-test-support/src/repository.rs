//! Test repositories: `PaymentRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use payflow_core::aggregate::AggregateRoot;
use payflow_core::error::DomainError;
use payflow_core::repository::OutboxRecord;
use payflow_payments::domain::aggregates::{Payment, PaymentRecord};
use payflow_payments::domain::repository::{PaymentRepository, outbox_records};
use payflow_payments::domain::value_objects::PaymentId;

#[derive(Debug, Default)]
struct Tables {
    payments: HashMap<PaymentId, PaymentRecord>,
    outbox: Vec<OutboxRecord>,
}

/// An in-memory repository with the same write rules as the Postgres one:
/// a unique idempotency key, a conditional version check, and outbox rows
/// committed together with the payment row under a single lock.
#[derive(Debug, Default)]
pub struct InMemoryPaymentRepository {
    tables: Mutex<Tables>,
    fail_outbox: AtomicBool,
    lookups: AtomicUsize,
    saves: AtomicUsize,
}

impl InMemoryPaymentRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent outbox write fail, after the payment row has
    /// been staged but before anything is committed.
    pub fn fail_outbox_writes(&self) {
        self.fail_outbox.store(true, Ordering::SeqCst);
    }

    /// Lets outbox writes succeed again after [`Self::fail_outbox_writes`].
    pub fn resume_outbox_writes(&self) {
        self.fail_outbox.store(false, Ordering::SeqCst);
    }

    /// Number of stored payments.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn payment_count(&self) -> usize {
        self.tables.lock().unwrap().payments.len()
    }

    /// Stored payments holding `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn payments_with_key(&self, key: &str) -> Vec<PaymentRecord> {
        self.tables
            .lock()
            .unwrap()
            .payments
            .values()
            .filter(|p| p.idempotency_key == key)
            .cloned()
            .collect()
    }

    /// Snapshot of all committed outbox rows, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn outbox(&self) -> Vec<OutboxRecord> {
        self.tables.lock().unwrap().outbox.clone()
    }

    /// Number of `find_by_idempotency_key` and `find_by_id` calls.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of `save` calls, successful or not.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, payment: &mut Payment) -> Result<Vec<OutboxRecord>, DomainError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let records = outbox_records(payment)?;
        let row = payment.to_record();

        let mut tables = self.tables.lock().unwrap();
        match tables.payments.get(&row.id) {
            Some(stored) if stored.version != row.version - 1 => {
                return Err(DomainError::VersionConflict {
                    aggregate_id: row.id.as_uuid(),
                    attempted_version: row.version,
                });
            }
            Some(_) => {}
            None => {
                if tables
                    .payments
                    .values()
                    .any(|p| p.idempotency_key == row.idempotency_key)
                {
                    return Err(DomainError::DuplicateIdempotencyKey(row.idempotency_key));
                }
            }
        }

        if self.fail_outbox.load(Ordering::SeqCst) && !records.is_empty() {
            return Err(DomainError::Infrastructure(
                "insert outbox event: simulated failure".into(),
            ));
        }

        tables.payments.insert(row.id, row);
        tables.outbox.extend(records.iter().cloned());
        drop(tables);
        payment.drain_events();
        Ok(records)
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Payment>, DomainError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .payments
            .values()
            .find(|p| p.idempotency_key == key)
            .cloned()
            .map(Payment::reconstitute))
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Payment, DomainError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        tables
            .payments
            .get(&id)
            .cloned()
            .map(Payment::reconstitute)
            .ok_or(DomainError::AggregateNotFound(id.as_uuid()))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

/// A repository that always returns an infrastructure error. Useful for
/// testing error-handling paths and "store never touched" assertions.
#[derive(Debug)]
pub struct FailingPaymentRepository;

#[async_trait]
impl PaymentRepository for FailingPaymentRepository {
    async fn save(&self, _payment: &mut Payment) -> Result<Vec<OutboxRecord>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn find_by_idempotency_key(&self, _key: &str) -> Result<Option<Payment>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn find_by_id(&self, _id: PaymentId) -> Result<Payment, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// A repository whose calls never complete, for exercising store deadlines.
#[derive(Debug)]
pub struct HangingPaymentRepository;

#[async_trait]
impl PaymentRepository for HangingPaymentRepository {
    async fn save(&self, _payment: &mut Payment) -> Result<Vec<OutboxRecord>, DomainError> {
        std::future::pending().await
    }

    async fn find_by_idempotency_key(&self, _key: &str) -> Result<Option<Payment>, DomainError> {
        std::future::pending().await
    }

    async fn find_by_id(&self, _id: PaymentId) -> Result<Payment, DomainError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        std::future::pending().await
    }
}
