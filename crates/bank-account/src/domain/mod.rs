//! Domain model for the bank account context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod money;
pub mod snapshot;
