//! Payflow Store: PostgreSQL persistence for payments.
//!
//! Writes each payment row and its outbox rows in one transaction, with
//! optimistic concurrency on the row version.

pub mod outbox;
pub mod pg_payment_repository;
pub mod schema;
