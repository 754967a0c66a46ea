//! Repository abstractions: the event store, snapshots, the read model and
//! the projector's committed offsets.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{DomainError, InfrastructureError};
use crate::event::DomainEvent;

/// Result of reading an aggregate's events back from the log.
#[derive(Debug, Clone)]
pub struct EventStream<E> {
    /// Events in version order, strictly consecutive.
    pub events: Vec<E>,
    /// Partition the events were read from.
    pub partition: u32,
    /// Offset of the last event included, if any were read.
    pub last_read_offset: Option<i64>,
    /// Aggregate version after applying every event in the stream.
    pub resulting_version: i64,
}

impl<E> EventStream<E> {
    /// A stream with no events.
    #[must_use]
    pub fn empty(partition: u32, last_read_offset: Option<i64>, resulting_version: i64) -> Self {
        Self {
            events: Vec::new(),
            partition,
            last_read_offset,
            resulting_version,
        }
    }

    /// Returns `true` if no events were read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// Append and replay of an aggregate's events.
#[async_trait]
pub trait EventStore<E: DomainEvent>: Send + Sync {
    /// Appends `events` in order and returns the offset of the last one, or
    /// `None` when `events` is empty.
    async fn append(&self, aggregate_id: Uuid, events: &[E]) -> Result<Option<i64>, DomainError>;

    /// Replays every event of the aggregate from the start of its partition.
    async fn load_full_stream(&self, aggregate_id: Uuid) -> Result<EventStream<E>, DomainError>;

    /// Replays the aggregate's events located after `offset`, expecting the
    /// first one to carry `expected_version`.
    async fn load_stream_after(
        &self,
        aggregate_id: Uuid,
        offset: i64,
        expected_version: i64,
    ) -> Result<EventStream<E>, DomainError>;

    /// Replays the aggregate's events whose version is below
    /// `target_version_exclusive`.
    async fn load_stream_up_to_version(
        &self,
        aggregate_id: Uuid,
        target_version_exclusive: i64,
    ) -> Result<EventStream<E>, DomainError>;
}

/// Persisted checkpoint of an account at a log offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    /// Synthetic row identifier.
    pub id: Uuid,
    /// Account the snapshot belongs to.
    pub account_id: Uuid,
    /// Account holder name.
    pub account_name: String,
    /// Balance at the snapshot.
    pub balance: Decimal,
    /// Aggregate version at the snapshot.
    pub version: i64,
    /// Log offset of the last event folded into the snapshot.
    pub offset: i64,
}

/// Storage for account snapshots. Older snapshots are kept.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stores a snapshot.
    async fn save(&self, snapshot: &SnapshotRecord) -> Result<(), InfrastructureError>;

    /// Returns the highest-version snapshot of the account, if any.
    async fn get_latest(&self, account_id: Uuid)
    -> Result<Option<SnapshotRecord>, InfrastructureError>;
}

/// Read-model row for an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionRow {
    /// Account identifier (primary key).
    pub account_id: Uuid,
    /// Account holder name.
    pub account_name: String,
    /// Current balance.
    pub balance: Decimal,
    /// Version of the last event projected.
    pub version: i64,
}

/// Keyed storage for the account read model.
#[async_trait]
pub trait ProjectionRepository: Send + Sync {
    /// Returns the row for `account_id`, if one exists.
    async fn find_by_id(&self, account_id: Uuid)
    -> Result<Option<ProjectionRow>, InfrastructureError>;

    /// Inserts or overwrites the row keyed by `row.account_id`.
    async fn save(&self, row: &ProjectionRow) -> Result<(), InfrastructureError>;
}

/// Committed consumer positions, per consumer group and partition.
#[async_trait]
pub trait ConsumerOffsetStore: Send + Sync {
    /// Offset of the next record the group should process in `partition`.
    async fn committed(&self, group_id: &str, partition: u32)
    -> Result<Option<i64>, InfrastructureError>;

    /// Records that every record before `next_offset` has been processed.
    async fn commit(
        &self,
        group_id: &str,
        partition: u32,
        next_offset: i64,
    ) -> Result<(), InfrastructureError>;
}
