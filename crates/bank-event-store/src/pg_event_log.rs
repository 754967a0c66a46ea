//! `PostgreSQL` implementation of the `EventLog` port.
//!
//! Each partition is a run of rows in `event_log` ordered by `log_offset`.
//! Appends to one partition are serialized with a transaction-scoped
//! advisory lock so offsets stay dense and gap-free.

use std::time::Duration;

use async_trait::async_trait;
use bank_core::config::EventStoreConfig;
use bank_core::error::InfrastructureError;
use bank_core::log::{EventLog, LogRecord, PolledRecord};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::time::{Instant, sleep};

use crate::storage_error;

/// Pause between two empty reads while a poll waits for new records.
const POLL_BACKOFF: Duration = Duration::from_millis(25);

/// PostgreSQL-backed partitioned log.
#[derive(Debug, Clone)]
pub struct PgEventLog {
    pool: PgPool,
    topic: String,
    partitions: u32,
    max_poll_records: i64,
}

impl PgEventLog {
    /// Creates a log over `pool` with the topic and partitioning of `config`.
    #[must_use]
    pub fn new(pool: PgPool, config: &EventStoreConfig) -> Self {
        Self {
            pool,
            topic: config.topic.clone(),
            partitions: config.partitions.max(1),
            max_poll_records: i64::from(config.max_poll_records.max(1)),
        }
    }

    fn partition_id(&self, partition: u32) -> Result<i32, InfrastructureError> {
        if partition >= self.partitions {
            return Err(InfrastructureError::Unavailable(format!(
                "partition {partition} does not exist in topic {}",
                self.topic
            )));
        }
        i32::try_from(partition).map_err(|e| InfrastructureError::Storage(e.to_string()))
    }

    async fn read_batch(
        &self,
        partition: u32,
        partition_id: i32,
        from_offset: i64,
    ) -> Result<Vec<PolledRecord>, InfrastructureError> {
        let rows = sqlx::query(
            "SELECT log_offset, record_key, event_type, payload FROM event_log \
             WHERE topic = $1 AND partition_id = $2 AND log_offset >= $3 \
             ORDER BY log_offset LIMIT $4",
        )
        .bind(&self.topic)
        .bind(partition_id)
        .bind(from_offset)
        .bind(self.max_poll_records)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter()
            .map(|row| row_to_polled_record(partition, row))
            .collect()
    }
}

#[async_trait]
impl EventLog for PgEventLog {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn partition_count(&self) -> u32 {
        self.partitions
    }

    async fn append(&self, partition: u32, record: LogRecord) -> Result<i64, InfrastructureError> {
        let partition_id = self.partition_id(partition)?;
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), $2)")
            .bind(&self.topic)
            .bind(partition_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        let offset: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(log_offset) + 1, 0) FROM event_log \
             WHERE topic = $1 AND partition_id = $2",
        )
        .bind(&self.topic)
        .bind(partition_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            "INSERT INTO event_log (topic, partition_id, log_offset, record_key, event_type, payload) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&self.topic)
        .bind(partition_id)
        .bind(offset)
        .bind(&record.key)
        .bind(&record.event_type)
        .bind(&record.payload)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(offset)
    }

    async fn poll(
        &self,
        partition: u32,
        from_offset: i64,
        max_wait: Duration,
    ) -> Result<Vec<PolledRecord>, InfrastructureError> {
        let partition_id = self.partition_id(partition)?;
        let deadline = Instant::now() + max_wait;

        loop {
            let batch = self.read_batch(partition, partition_id, from_offset).await?;
            let now = Instant::now();
            if !batch.is_empty() || now >= deadline {
                return Ok(batch);
            }
            sleep(POLL_BACKOFF.min(deadline - now)).await;
        }
    }

    async fn high_water_mark(&self, partition: u32) -> Result<i64, InfrastructureError> {
        let partition_id = self.partition_id(partition)?;
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(log_offset) + 1, 0) FROM event_log \
             WHERE topic = $1 AND partition_id = $2",
        )
        .bind(&self.topic)
        .bind(partition_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)
    }
}

fn row_to_polled_record(partition: u32, row: &PgRow) -> Result<PolledRecord, InfrastructureError> {
    Ok(PolledRecord {
        partition,
        offset: row.try_get("log_offset").map_err(storage_error)?,
        record: LogRecord {
            key: row.try_get("record_key").map_err(storage_error)?,
            event_type: row.try_get("event_type").map_err(storage_error)?,
            payload: row.try_get("payload").map_err(storage_error)?,
        },
    })
}
