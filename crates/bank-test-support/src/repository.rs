//! Test repositories — in-memory snapshot, projection and offset stores.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bank_core::error::InfrastructureError;
use bank_core::repository::{
    ConsumerOffsetStore, ProjectionRepository, ProjectionRow, SnapshotRecord, SnapshotStore,
};
use uuid::Uuid;

/// A snapshot store that keeps every saved snapshot in memory.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    saved: Mutex<Vec<SnapshotRecord>>,
}

impl InMemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every snapshot saved so far, in save order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved(&self) -> Vec<SnapshotRecord> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: &SnapshotRecord) -> Result<(), InfrastructureError> {
        self.saved.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn get_latest(
        &self,
        account_id: Uuid,
    ) -> Result<Option<SnapshotRecord>, InfrastructureError> {
        Ok(self
            .saved
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.account_id == account_id)
            .max_by_key(|s| s.version)
            .cloned())
    }
}

/// A snapshot store that always fails. Useful for testing error-handling paths.
#[derive(Debug)]
pub struct FailingSnapshotStore;

#[async_trait]
impl SnapshotStore for FailingSnapshotStore {
    async fn save(&self, _snapshot: &SnapshotRecord) -> Result<(), InfrastructureError> {
        Err(InfrastructureError::Storage("connection refused".into()))
    }

    async fn get_latest(
        &self,
        _account_id: Uuid,
    ) -> Result<Option<SnapshotRecord>, InfrastructureError> {
        Err(InfrastructureError::Storage("connection refused".into()))
    }
}

/// A read-model store held in memory, keyed by account id.
#[derive(Debug, Default)]
pub struct InMemoryProjectionRepository {
    rows: Mutex<HashMap<Uuid, ProjectionRow>>,
    writes: Mutex<usize>,
}

impl InMemoryProjectionRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the row for `account_id`, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn row(&self, account_id: Uuid) -> Option<ProjectionRow> {
        self.rows.lock().unwrap().get(&account_id).cloned()
    }

    /// Number of successful `save` calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl ProjectionRepository for InMemoryProjectionRepository {
    async fn find_by_id(
        &self,
        account_id: Uuid,
    ) -> Result<Option<ProjectionRow>, InfrastructureError> {
        Ok(self.row(account_id))
    }

    async fn save(&self, row: &ProjectionRow) -> Result<(), InfrastructureError> {
        self.rows.lock().unwrap().insert(row.account_id, row.clone());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

/// A read-model store that always fails. Useful for testing error-handling paths.
#[derive(Debug)]
pub struct FailingProjectionRepository;

#[async_trait]
impl ProjectionRepository for FailingProjectionRepository {
    async fn find_by_id(
        &self,
        _account_id: Uuid,
    ) -> Result<Option<ProjectionRow>, InfrastructureError> {
        Err(InfrastructureError::Storage("connection refused".into()))
    }

    async fn save(&self, _row: &ProjectionRow) -> Result<(), InfrastructureError> {
        Err(InfrastructureError::Storage("connection refused".into()))
    }
}

/// Committed consumer offsets held in memory.
#[derive(Debug, Default)]
pub struct InMemoryConsumerOffsetStore {
    offsets: Mutex<HashMap<(String, u32), i64>>,
}

impl InMemoryConsumerOffsetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsumerOffsetStore for InMemoryConsumerOffsetStore {
    async fn committed(
        &self,
        group_id: &str,
        partition: u32,
    ) -> Result<Option<i64>, InfrastructureError> {
        Ok(self
            .offsets
            .lock()
            .unwrap()
            .get(&(group_id.to_owned(), partition))
            .copied())
    }

    async fn commit(
        &self,
        group_id: &str,
        partition: u32,
        next_offset: i64,
    ) -> Result<(), InfrastructureError> {
        self.offsets
            .lock()
            .unwrap()
            .insert((group_id.to_owned(), partition), next_offset);
        Ok(())
    }
}
