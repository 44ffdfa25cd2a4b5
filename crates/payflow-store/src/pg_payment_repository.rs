//! `PostgreSQL` implementation of the `PaymentRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::error::DomainError;
use payflow_core::repository::OutboxRecord;
use payflow_payments::domain::aggregates::{Payment, PaymentRecord};
use payflow_payments::domain::repository::{PaymentRepository, outbox_records};
use payflow_payments::domain::value_objects::{Money, PaymentId};

use crate::outbox::write_outbox_record;
use crate::schema::IDEMPOTENCY_KEY_CONSTRAINT;

/// Insert-or-update in one statement. The update branch only applies when
/// the stored version is exactly one behind, so a stale writer matches no
/// row instead of overwriting.
const UPSERT_PAYMENT: &str = r"
INSERT INTO payments (
    id, order_id, customer_id, amount_cents, currency, status,
    provider_ref, failure_reason, idempotency_key, created_at, updated_at, version
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
ON CONFLICT (id) DO UPDATE SET
    status         = EXCLUDED.status,
    provider_ref   = EXCLUDED.provider_ref,
    failure_reason = EXCLUDED.failure_reason,
    updated_at     = EXCLUDED.updated_at,
    version        = EXCLUDED.version
WHERE payments.version = EXCLUDED.version - 1
";

const SELECT_PAYMENT: &str = r"
SELECT id, order_id, customer_id, amount_cents, currency, status,
       provider_ref, failure_reason, idempotency_key, created_at, updated_at, version
FROM payments
";

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: String,
    customer_id: String,
    amount_cents: i64,
    currency: String,
    status: String,
    provider_ref: String,
    failure_reason: String,
    idempotency_key: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let corrupt = |e: DomainError| {
            DomainError::Infrastructure(format!("corrupt payment row {}: {e}", row.id))
        };
        let amount = Money::new(row.amount_cents, &row.currency).map_err(corrupt)?;
        let status = row.status.parse().map_err(corrupt)?;
        Ok(Self {
            id: PaymentId::from(row.id),
            order_id: row.order_id,
            customer_id: row.customer_id,
            amount,
            status,
            provider_ref: row.provider_ref,
            failure_reason: row.failure_reason,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

/// PostgreSQL-backed payment repository.
#[derive(Debug, Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    /// Creates a new `PgPaymentRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::Infrastructure(format!("{operation}: {e}"))
}

fn upsert_error(e: sqlx::Error, record: &PaymentRecord) -> DomainError {
    match e {
        sqlx::Error::Database(db)
            if db.is_unique_violation() && db.constraint() == Some(IDEMPOTENCY_KEY_CONSTRAINT) =>
        {
            DomainError::DuplicateIdempotencyKey(record.idempotency_key.clone())
        }
        other => DomainError::Infrastructure(format!("upsert payment: {other}")),
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    #[instrument(skip_all, fields(payment_id = %payment.id(), idempotency_key = %payment.idempotency_key()))]
    async fn save(&self, payment: &mut Payment) -> Result<Vec<OutboxRecord>, DomainError> {
        let records = outbox_records(payment)?;
        let record = payment.to_record();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("begin transaction"))?;

        let written = sqlx::query(UPSERT_PAYMENT)
            .bind(record.id.as_uuid())
            .bind(&record.order_id)
            .bind(&record.customer_id)
            .bind(record.amount.amount())
            .bind(record.amount.currency())
            .bind(record.status.as_str())
            .bind(&record.provider_ref)
            .bind(&record.failure_reason)
            .bind(&record.idempotency_key)
            .bind(record.created_at)
            .bind(record.updated_at)
            .bind(record.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| upsert_error(e, &record))?;

        if written.rows_affected() == 0 {
            return Err(DomainError::VersionConflict {
                aggregate_id: record.id.as_uuid(),
                attempted_version: record.version,
            });
        }

        for outbox_record in &records {
            write_outbox_record(&mut tx, outbox_record).await?;
        }

        tx.commit().await.map_err(store_error("commit payment"))?;
        payment.drain_events();
        debug!(
            version = record.version,
            outbox_rows = records.len(),
            "payment saved"
        );
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{SELECT_PAYMENT} WHERE idempotency_key = $1"))
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error("select payment by idempotency key"))?;

        row.map(|row| PaymentRecord::try_from(row).map(Payment::reconstitute))
            .transpose()
    }

    #[instrument(skip(self), fields(payment_id = %id))]
    async fn find_by_id(&self, id: PaymentId) -> Result<Payment, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("{SELECT_PAYMENT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error("select payment by id"))?;

        let row = row.ok_or(DomainError::AggregateNotFound(id.as_uuid()))?;
        PaymentRecord::try_from(row).map(Payment::reconstitute)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error("ping database"))?;
        Ok(())
    }
}
