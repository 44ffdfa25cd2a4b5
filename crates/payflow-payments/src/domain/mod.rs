//! Domain model for payments.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod repository;
pub mod value_objects;
