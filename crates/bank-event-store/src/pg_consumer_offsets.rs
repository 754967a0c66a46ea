//! `PostgreSQL` implementation of committed consumer offsets.

use async_trait::async_trait;
use bank_core::error::InfrastructureError;
use bank_core::repository::ConsumerOffsetStore;
use sqlx::PgPool;

use crate::storage_error;

/// Consumer offsets for one topic, stored in `consumer_offsets`.
#[derive(Debug, Clone)]
pub struct PgConsumerOffsetStore {
    pool: PgPool,
    topic: String,
}

impl PgConsumerOffsetStore {
    /// Creates a store tracking offsets of `topic`.
    #[must_use]
    pub fn new(pool: PgPool, topic: impl Into<String>) -> Self {
        Self {
            pool,
            topic: topic.into(),
        }
    }
}

fn partition_id(partition: u32) -> Result<i32, InfrastructureError> {
    i32::try_from(partition).map_err(|e| InfrastructureError::Storage(e.to_string()))
}

#[async_trait]
impl ConsumerOffsetStore for PgConsumerOffsetStore {
    async fn committed(
        &self,
        group_id: &str,
        partition: u32,
    ) -> Result<Option<i64>, InfrastructureError> {
        sqlx::query_scalar(
            "SELECT next_offset FROM consumer_offsets \
             WHERE group_id = $1 AND topic = $2 AND partition_id = $3",
        )
        .bind(group_id)
        .bind(&self.topic)
        .bind(partition_id(partition)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)
    }

    async fn commit(
        &self,
        group_id: &str,
        partition: u32,
        next_offset: i64,
    ) -> Result<(), InfrastructureError> {
        sqlx::query(
            "INSERT INTO consumer_offsets (group_id, topic, partition_id, next_offset) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (group_id, topic, partition_id) DO UPDATE \
             SET next_offset = EXCLUDED.next_offset",
        )
        .bind(group_id)
        .bind(&self.topic)
        .bind(partition_id(partition)?)
        .bind(next_offset)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}
