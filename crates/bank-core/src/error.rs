//! Domain error types.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Coarse classification of a [`DomainError`], used to decide how callers
/// react (reject, report missing, halt, or surface as an outage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller error. Never retried.
    Validation,
    /// The addressed aggregate does not exist.
    NotFound,
    /// Store or delivery corruption. Not locally recoverable.
    Consistency,
    /// A lower-level transport or storage failure.
    Infrastructure,
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A monetary amount was negative or absent.
    #[error("negative amount: {0}")]
    NegativeAmount(String),

    /// A withdrawal exceeded the available balance.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance at the time of the withdrawal.
        available: Decimal,
        /// Amount that was requested.
        requested: Decimal,
    },

    /// The command is not valid against the aggregate's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// No command was supplied.
    #[error("command must be provided")]
    CommandMissing,

    /// No events exist for the account.
    #[error("account not found: {0}")]
    AccountNotFound(Uuid),

    /// A replayed stream skipped or repeated a version.
    #[error(
        "inconsistent event stream for aggregate {aggregate_id}: expected version {expected}, got {actual} at offset {offset}"
    )]
    InconsistentEventStream {
        /// The aggregate being replayed.
        aggregate_id: Uuid,
        /// The version the next event should have carried.
        expected: i64,
        /// The version it actually carried.
        actual: i64,
        /// Log offset of the offending record.
        offset: i64,
    },

    /// The rebuilt aggregate disagrees with the version an incoming event assumes.
    #[error(
        "projection version mismatch for aggregate {aggregate_id}: expected {expected}, rebuilt {actual} (offset {offset})"
    )]
    ProjectionVersionMismatch {
        /// The aggregate being projected.
        aggregate_id: Uuid,
        /// The version carried by the incoming event.
        expected: i64,
        /// The version reached by the rebuild.
        actual: i64,
        /// Log offset of the incoming event.
        offset: i64,
    },

    /// A non-creation event arrived for an account with no projection row.
    #[error(
        "no projection found for aggregate {aggregate_id} at version {version}, expected version 1 (offset {offset})"
    )]
    AccountAlreadyExists {
        /// The aggregate being projected.
        aggregate_id: Uuid,
        /// The version the projection would have been written at.
        version: i64,
        /// Log offset of the incoming event.
        offset: i64,
    },

    /// A log record carried an event kind this service does not know.
    #[error("unsupported event type: {0}")]
    UnsupportedEventType(String),

    /// Writing events to the log failed, possibly after a partial write.
    #[error("event persistence failure: {0}")]
    EventPersistence(String),

    /// Reading events back from the log failed.
    #[error("event replay failure: {0}")]
    EventReplay(String),

    /// Reading or writing a snapshot failed.
    #[error("snapshot failure: {0}")]
    Snapshot(String),

    /// An unexpected failure while projecting an event.
    #[error("projection failure: {0}")]
    Projection(String),
}

impl DomainError {
    /// Returns the category this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NegativeAmount(_)
            | Self::InsufficientFunds { .. }
            | Self::InvalidOperation(_)
            | Self::CommandMissing => ErrorCategory::Validation,
            Self::AccountNotFound(_) => ErrorCategory::NotFound,
            Self::InconsistentEventStream { .. }
            | Self::ProjectionVersionMismatch { .. }
            | Self::AccountAlreadyExists { .. }
            | Self::UnsupportedEventType(_) => ErrorCategory::Consistency,
            Self::EventPersistence(_)
            | Self::EventReplay(_)
            | Self::Snapshot(_)
            | Self::Projection(_) => ErrorCategory::Infrastructure,
        }
    }
}

/// Failure reported by a port implementation (log transport, relational store).
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// The backing service could not be reached or refused the request.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded or decoded.
    #[error("serialization: {0}")]
    Serialization(String),

    /// The backing store rejected a read or write.
    #[error("storage: {0}")]
    Storage(String),
}
