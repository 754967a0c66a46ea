//! Durable, partitioned, ordered log transport.
//!
//! The log is the single source of truth for domain events. It is split into
//! a fixed number of partitions; order is total within a partition and
//! undefined across partitions. Every appended record gets a monotonically
//! increasing offset within its partition, starting at 0.
//!
//! The transport offers no per-key cursor and no blocking "end of stream"
//! signal: readers poll a partition from an offset and receive whatever is
//! visible within a bounded wait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::InfrastructureError;

/// A record to be appended to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Routing key. For domain events this is the stringified aggregate id.
    pub key: String,
    /// Event type name, used to pick a decoder.
    pub event_type: String,
    /// Serialized event.
    pub payload: serde_json::Value,
}

/// A record read back from the log, with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct PolledRecord {
    /// Partition the record lives in.
    pub partition: u32,
    /// Offset of the record within its partition.
    pub offset: i64,
    /// The record as appended.
    pub record: LogRecord,
}

/// Port to the durable ordered log.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Name of the topic this log serves.
    fn topic(&self) -> &str;

    /// Fixed number of partitions of the topic.
    fn partition_count(&self) -> u32;

    /// Appends `record` to `partition` and returns its offset.
    async fn append(&self, partition: u32, record: LogRecord) -> Result<i64, InfrastructureError>;

    /// Returns the records of `partition` starting at `from_offset`, in
    /// offset order. Waits at most `max_wait` for records to become visible;
    /// an empty batch means nothing arrived within that window.
    async fn poll(
        &self,
        partition: u32,
        from_offset: i64,
        max_wait: Duration,
    ) -> Result<Vec<PolledRecord>, InfrastructureError>;

    /// Offset the next appended record of `partition` will receive.
    async fn high_water_mark(&self, partition: u32) -> Result<i64, InfrastructureError>;
}
