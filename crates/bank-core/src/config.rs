//! Configuration passed to component constructors at process start.

use std::time::Duration;

/// Topology of the event topic and tuning of the bounded replay.
///
/// Every replay polls the aggregate's partition in rounds of at most
/// `poll_timeout` and stops after `max_polls` rounds or after
/// `max_consecutive_empty_polls` rounds in a row returned nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventStoreConfig {
    /// Topic holding the account events.
    pub topic: String,
    /// Number of partitions of the topic.
    pub partitions: u32,
    /// Maximum wait of a single poll round.
    pub poll_timeout: Duration,
    /// Maximum number of poll rounds per replay.
    pub max_polls: u32,
    /// Number of consecutive empty rounds that ends a replay.
    pub max_consecutive_empty_polls: u32,
    /// Maximum number of records returned by one poll.
    pub max_poll_records: u32,
    /// Fail replays that stop before the partition's high-water mark
    /// instead of returning a truncated stream.
    pub detect_truncation: bool,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            topic: "account-events".to_owned(),
            partitions: 3,
            poll_timeout: Duration::from_millis(200),
            max_polls: 5,
            max_consecutive_empty_polls: 1,
            max_poll_records: 500,
            detect_truncation: true,
        }
    }
}
