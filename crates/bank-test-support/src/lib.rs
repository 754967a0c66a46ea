//! Shared test mocks and in-memory ports for the bank account command service.

mod clock;
mod log;
mod repository;

pub use clock::FixedClock;
pub use log::{FailingEventLog, InMemoryEventLog};
pub use repository::{
    FailingProjectionRepository, FailingSnapshotStore, InMemoryConsumerOffsetStore,
    InMemoryProjectionRepository, InMemorySnapshotStore,
};
