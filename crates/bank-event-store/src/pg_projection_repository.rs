//! `PostgreSQL` implementation of the account read model.

use async_trait::async_trait;
use bank_core::error::InfrastructureError;
use bank_core::repository::{ProjectionRepository, ProjectionRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::storage_error;

/// PostgreSQL-backed `accounts` table.
#[derive(Debug, Clone)]
pub struct PgProjectionRepository {
    pool: PgPool,
}

impl PgProjectionRepository {
    /// Creates a new `PgProjectionRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectionRepository for PgProjectionRepository {
    async fn find_by_id(
        &self,
        account_id: Uuid,
    ) -> Result<Option<ProjectionRow>, InfrastructureError> {
        let row = sqlx::query("SELECT id, name, balance, version FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(|row| {
            Ok(ProjectionRow {
                account_id: row.try_get("id").map_err(storage_error)?,
                account_name: row.try_get("name").map_err(storage_error)?,
                balance: row.try_get("balance").map_err(storage_error)?,
                version: row.try_get("version").map_err(storage_error)?,
            })
        })
        .transpose()
    }

    async fn save(&self, row: &ProjectionRow) -> Result<(), InfrastructureError> {
        sqlx::query(
            "INSERT INTO accounts (id, name, balance, version) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE \
             SET name = EXCLUDED.name, balance = EXCLUDED.balance, version = EXCLUDED.version",
        )
        .bind(row.account_id)
        .bind(&row.account_name)
        .bind(row.balance)
        .bind(row.version)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}
