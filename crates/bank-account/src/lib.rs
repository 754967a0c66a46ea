//! Bank account bounded context.
//!
//! Responsible for the account aggregate and its events, the command
//! handlers that load, mutate and persist accounts, and the projector that
//! keeps the relational read model in step with the event log.

pub mod application;
pub mod domain;
