//! Test logs — in-memory `EventLog` implementations for tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bank_core::error::InfrastructureError;
use bank_core::log::{EventLog, LogRecord, PolledRecord};

#[derive(Debug)]
struct LogState {
    partitions: Vec<Vec<LogRecord>>,
    remaining_appends: Option<usize>,
    polls: usize,
}

/// A partitioned log held in memory.
///
/// Polls never wait: they return whatever is visible immediately. The log
/// can be tuned to return small batches, to hide the newest records from
/// pollers (simulating replication lag), and to start failing appends after
/// a number of successful ones.
#[derive(Debug)]
pub struct InMemoryEventLog {
    topic: String,
    partition_count: u32,
    batch_size: usize,
    visibility_lag: usize,
    state: Mutex<LogState>,
}

impl InMemoryEventLog {
    /// Creates an empty log with `partition_count` partitions.
    ///
    /// # Panics
    ///
    /// Panics if `partition_count` is zero.
    #[must_use]
    pub fn new(partition_count: u32) -> Self {
        assert!(partition_count > 0, "a log needs at least one partition");
        Self {
            topic: "account-events".to_owned(),
            partition_count,
            batch_size: usize::MAX,
            visibility_lag: 0,
            state: Mutex::new(LogState {
                partitions: vec![Vec::new(); partition_count as usize],
                remaining_appends: None,
                polls: 0,
            }),
        }
    }

    /// Limits every poll to at most `batch_size` records.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Hides the newest `records` of every partition from `poll` while still
    /// counting them in `high_water_mark`.
    #[must_use]
    pub fn with_visibility_lag(mut self, records: usize) -> Self {
        self.visibility_lag = records;
        self
    }

    /// Lets the next `appends` appends succeed and fails every one after.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_appends_after(&self, appends: usize) {
        self.state.lock().unwrap().remaining_appends = Some(appends);
    }

    /// Returns a copy of every record in `partition`, in offset order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned or the partition does not exist.
    pub fn records(&self, partition: u32) -> Vec<LogRecord> {
        self.state.lock().unwrap().partitions[partition as usize].clone()
    }

    /// Total number of records across all partitions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .partitions
            .iter()
            .map(Vec::len)
            .sum()
    }

    /// Returns `true` if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `poll` calls served so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn poll_count(&self) -> usize {
        self.state.lock().unwrap().polls
    }

    fn check_partition(&self, partition: u32) -> Result<usize, InfrastructureError> {
        if partition < self.partition_count {
            Ok(partition as usize)
        } else {
            Err(InfrastructureError::Unavailable(format!(
                "partition {partition} does not exist in topic {}",
                self.topic
            )))
        }
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn partition_count(&self) -> u32 {
        self.partition_count
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn append(&self, partition: u32, record: LogRecord) -> Result<i64, InfrastructureError> {
        let index = self.check_partition(partition)?;
        let mut state = self.state.lock().unwrap();
        match state.remaining_appends {
            Some(0) => {
                return Err(InfrastructureError::Unavailable("broker not available".into()));
            }
            Some(ref mut remaining) => *remaining -= 1,
            None => {}
        }
        let records = &mut state.partitions[index];
        records.push(record);
        Ok(records.len() as i64 - 1)
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    async fn poll(
        &self,
        partition: u32,
        from_offset: i64,
        _max_wait: Duration,
    ) -> Result<Vec<PolledRecord>, InfrastructureError> {
        let index = self.check_partition(partition)?;
        let mut state = self.state.lock().unwrap();
        state.polls += 1;
        let records = &state.partitions[index];
        let visible = records.len().saturating_sub(self.visibility_lag);
        let start = from_offset.max(0) as usize;
        if start >= visible {
            return Ok(Vec::new());
        }
        Ok(records[start..visible]
            .iter()
            .enumerate()
            .take(self.batch_size)
            .map(|(i, record)| PolledRecord {
                partition,
                offset: (start + i) as i64,
                record: record.clone(),
            })
            .collect())
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn high_water_mark(&self, partition: u32) -> Result<i64, InfrastructureError> {
        let index = self.check_partition(partition)?;
        Ok(self.state.lock().unwrap().partitions[index].len() as i64)
    }
}

/// A log whose every operation fails with a transport error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventLog;

#[async_trait]
impl EventLog for FailingEventLog {
    fn topic(&self) -> &str {
        "account-events"
    }

    fn partition_count(&self) -> u32 {
        1
    }

    async fn append(&self, _partition: u32, _record: LogRecord) -> Result<i64, InfrastructureError> {
        Err(InfrastructureError::Unavailable("connection refused".into()))
    }

    async fn poll(
        &self,
        _partition: u32,
        _from_offset: i64,
        _max_wait: Duration,
    ) -> Result<Vec<PolledRecord>, InfrastructureError> {
        Err(InfrastructureError::Unavailable("connection refused".into()))
    }

    async fn high_water_mark(&self, _partition: u32) -> Result<i64, InfrastructureError> {
        Err(InfrastructureError::Unavailable("connection refused".into()))
    }
}
