//! Commands for the payments context.

use payflow_core::command::Command;
use uuid::Uuid;

/// Command to initiate a payment exactly once per idempotency key.
#[derive(Debug, Clone)]
pub struct InitiatePayment {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order being paid for.
    pub order_id: String,
    /// The paying customer.
    pub customer_id: String,
    /// Amount in minor units.
    pub amount_minor: i64,
    /// Currency code as supplied by the client.
    pub currency: String,
    /// Client-supplied deduplication token.
    pub idempotency_key: String,
}

impl Command for InitiatePayment {
    fn command_type(&self) -> &'static str {
        "payments.initiate_payment"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn idempotency_key(&self) -> Option<&str> {
        Some(&self.idempotency_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiate_payment_exposes_its_idempotency_key() {
        let command = InitiatePayment {
            correlation_id: Uuid::new_v4(),
            order_id: "ORD-1".to_owned(),
            customer_id: "CUST-1".to_owned(),
            amount_minor: 1000,
            currency: "USD".to_owned(),
            idempotency_key: "K1".to_owned(),
        };

        assert_eq!(command.command_type(), "payments.initiate_payment");
        assert_eq!(Command::idempotency_key(&command), Some("K1"));
    }
}
