//! Bank Core — shared event-sourcing abstractions.
//!
//! This crate defines the traits and types the account context, the event
//! store and the API depend on: errors, events, aggregates, the log
//! transport and the store ports. It contains no infrastructure code.

pub mod aggregate;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod log;
pub mod repository;
