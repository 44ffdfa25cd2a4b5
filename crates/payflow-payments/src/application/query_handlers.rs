//! Query handlers for the payments context.

use chrono::{DateTime, Utc};
use payflow_core::aggregate::AggregateRoot;
use payflow_core::error::DomainError;
use serde::Serialize;

use crate::domain::aggregates::{Payment, PaymentStatus};
use crate::domain::repository::PaymentRepository;
use crate::domain::value_objects::PaymentId;

/// Read-only view of a payment aggregate.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    /// The payment identifier.
    pub payment_id: PaymentId,
    /// The order reference.
    pub order_id: String,
    /// The customer reference.
    pub customer_id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Current status.
    pub status: PaymentStatus,
    /// Provider reference, if processing has started.
    pub provider_ref: Option<String>,
    /// Failure reason, if the payment failed.
    pub failure_reason: Option<String>,
    /// Stored version.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentView {
    fn from(payment: &Payment) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_owned());
        Self {
            payment_id: payment.id(),
            order_id: payment.order_id().to_owned(),
            customer_id: payment.customer_id().to_owned(),
            amount: payment.amount().amount(),
            currency: payment.amount().currency().to_owned(),
            status: payment.status(),
            provider_ref: non_empty(payment.provider_ref()),
            failure_reason: non_empty(payment.failure_reason()),
            version: payment.version(),
            created_at: payment.created_at(),
            updated_at: payment.updated_at(),
        }
    }
}

/// Retrieves a payment by its identifier.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no payment has this id.
/// Returns `DomainError::Infrastructure` if the store cannot be queried.
pub async fn get_payment_by_id(
    payment_id: PaymentId,
    repo: &dyn PaymentRepository,
) -> Result<PaymentView, DomainError> {
    let payment = repo.find_by_id(payment_id).await?;
    Ok(PaymentView::from(&payment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::PaymentRecord;
    use crate::domain::value_objects::Money;
    use chrono::TimeZone;

    #[test]
    fn test_view_hides_empty_provider_and_failure_fields() {
        // Arrange
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let payment = Payment::reconstitute(PaymentRecord {
            id: PaymentId::generate(),
            order_id: "ORD-1".to_owned(),
            customer_id: "CUST-1".to_owned(),
            amount: Money::new(1000, "USD").unwrap(),
            status: PaymentStatus::Pending,
            provider_ref: String::new(),
            failure_reason: String::new(),
            idempotency_key: "K1".to_owned(),
            created_at: at,
            updated_at: at,
            version: 1,
        });

        // Act
        let view = PaymentView::from(&payment);

        // Assert
        assert_eq!(view.payment_id, payment.id());
        assert_eq!(view.amount, 1000);
        assert_eq!(view.currency, "USD");
        assert_eq!(view.status, PaymentStatus::Pending);
        assert_eq!(view.provider_ref, None);
        assert_eq!(view.failure_reason, None);
        assert_eq!(view.version, 1);
    }
}
