//! `PostgreSQL` implementation of the `SnapshotStore` trait.

use async_trait::async_trait;
use bank_core::error::InfrastructureError;
use bank_core::repository::{SnapshotRecord, SnapshotStore};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::storage_error;

/// PostgreSQL-backed snapshot store.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    /// Creates a new `PgSnapshotStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn save(&self, snapshot: &SnapshotRecord) -> Result<(), InfrastructureError> {
        sqlx::query(
            "INSERT INTO account_snapshots (id, account_id, name, balance, version, log_offset) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(snapshot.id)
        .bind(snapshot.account_id)
        .bind(&snapshot.account_name)
        .bind(snapshot.balance)
        .bind(snapshot.version)
        .bind(snapshot.offset)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn get_latest(
        &self,
        account_id: Uuid,
    ) -> Result<Option<SnapshotRecord>, InfrastructureError> {
        let row = sqlx::query(
            "SELECT id, account_id, name, balance, version, log_offset FROM account_snapshots \
             WHERE account_id = $1 ORDER BY version DESC LIMIT 1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(SnapshotRecord {
            id: row.try_get("id").map_err(storage_error)?,
            account_id: row.try_get("account_id").map_err(storage_error)?,
            account_name: row.try_get("name").map_err(storage_error)?,
            balance: row.try_get("balance").map_err(storage_error)?,
            version: row.try_get("version").map_err(storage_error)?,
            offset: row.try_get("log_offset").map_err(storage_error)?,
        }))
    }
}
