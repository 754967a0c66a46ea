//! Event store for the bank account command service.
//!
//! `LogEventStore` implements the `EventStore` port over any partitioned
//! `EventLog`. The `Pg*` types are the PostgreSQL adapters for the log, the
//! snapshot store, the read model and the projector's consumer offsets.

pub mod log_event_store;
pub mod partition;
pub mod pg_consumer_offsets;
pub mod pg_event_log;
pub mod pg_projection_repository;
pub mod pg_snapshot_store;
pub mod schema;

use bank_core::error::InfrastructureError;

pub use log_event_store::LogEventStore;
pub use pg_consumer_offsets::PgConsumerOffsetStore;
pub use pg_event_log::PgEventLog;
pub use pg_projection_repository::PgProjectionRepository;
pub use pg_snapshot_store::PgSnapshotStore;

/// Maps a database failure to the infrastructure error the ports speak.
pub(crate) fn storage_error(e: sqlx::Error) -> InfrastructureError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            InfrastructureError::Unavailable(e.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            InfrastructureError::Serialization(e.to_string())
        }
        other => InfrastructureError::Storage(other.to_string()),
    }
}
