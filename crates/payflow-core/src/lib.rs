//! Payflow Core: shared domain abstractions.
//!
//! This crate defines the traits and types that the payment context and
//! its infrastructure adapters agree on. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod idempotency;
pub mod repository;
pub mod telemetry;
