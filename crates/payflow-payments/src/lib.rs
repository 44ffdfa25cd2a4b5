//! Payflow: payment initiation bounded context.
//!
//! Responsible for the payment aggregate, its value types and events, and
//! the idempotent initiation protocol that coordinates the deduplication
//! cache with the authoritative store.

pub mod application;
pub mod domain;
