//! Outbox writer. Only ever called inside the transaction that writes the
//! aggregate row.

use payflow_core::error::DomainError;
use payflow_core::repository::OutboxRecord;
use sqlx::PgConnection;

const INSERT_OUTBOX_EVENT: &str = r"
INSERT INTO outbox_events (aggregate_id, event_type, payload)
VALUES ($1, $2, $3)
";

/// Inserts one outbox row on `conn`, which must be an open transaction.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the insert fails. The caller
/// must then abandon the transaction.
pub async fn write_outbox_record(
    conn: &mut PgConnection,
    record: &OutboxRecord,
) -> Result<(), DomainError> {
    sqlx::query(INSERT_OUTBOX_EVENT)
        .bind(record.aggregate_id)
        .bind(&record.event_type)
        .bind(&record.payload)
        .execute(conn)
        .await
        .map_err(|e| {
            DomainError::Infrastructure(format!(
                "insert outbox event {}: {e}",
                record.event_type
            ))
        })?;
    Ok(())
}
