//! Value objects for the payments context.

use std::fmt;
use std::str::FromStr;

use payflow_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, globally unique payment identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for PaymentId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<PaymentId> for Uuid {
    fn from(value: PaymentId) -> Self {
        value.0
    }
}

impl FromStr for PaymentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| DomainError::Validation(format!("invalid payment id: {s:?}")))
    }
}

/// A positive amount in integer minor units of a three-letter currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: String,
}

impl Money {
    /// Creates a money value, trimming and upper-casing the currency code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `amount` is not positive or the
    /// currency is not exactly three ASCII letters.
    pub fn new(amount: i64, currency: &str) -> Result<Self, DomainError> {
        if amount <= 0 {
            return Err(DomainError::Validation(format!(
                "amount must be positive, got {amount}"
            )));
        }
        let currency = currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(DomainError::Validation(format!(
                "currency must be a 3-letter code, got {currency:?}"
            )));
        }
        Ok(Self { amount, currency })
    }

    /// Amount in minor units.
    #[must_use]
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Upper-case ISO-style currency code.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
