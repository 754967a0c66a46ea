//! Application services for the bank account context.

pub mod command_handlers;
pub mod projection_runner;
pub mod projector;
