//! Route modules.

pub mod account;
pub mod health;
