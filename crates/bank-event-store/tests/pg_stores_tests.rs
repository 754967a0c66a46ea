//! Integration tests for the PostgreSQL adapters.
//!
//! These need a reachable database: run with `DATABASE_URL` set and
//! `cargo test -- --ignored`.

use std::time::Duration;

use bank_core::config::EventStoreConfig;
use bank_core::log::{EventLog, LogRecord};
use bank_core::repository::{
    ConsumerOffsetStore, ProjectionRepository, ProjectionRow, SnapshotRecord, SnapshotStore,
};
use bank_event_store::{
    PgConsumerOffsetStore, PgEventLog, PgProjectionRepository, PgSnapshotStore, schema,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

fn record(key: &str) -> LogRecord {
    LogRecord {
        key: key.to_owned(),
        event_type: "account.created".to_owned(),
        payload: serde_json::json!({"key": key}),
    }
}

fn snapshot(account_id: Uuid, version: i64, offset: i64) -> SnapshotRecord {
    SnapshotRecord {
        id: Uuid::new_v4(),
        account_id,
        account_name: "Alice".to_owned(),
        balance: Decimal::new(12_550, 2),
        version,
        offset,
    }
}

async fn setup(pool: &PgPool) {
    schema::apply(pool).await.unwrap();
}

// --- event log ---

#[sqlx::test(migrations = false)]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_append_assigns_dense_offsets_per_partition(pool: PgPool) {
    // Arrange
    setup(&pool).await;
    let log = PgEventLog::new(pool, &EventStoreConfig::default());

    // Act
    let first = log.append(0, record("a")).await.unwrap();
    let second = log.append(0, record("b")).await.unwrap();
    let other_partition = log.append(1, record("c")).await.unwrap();

    // Assert
    assert_eq!(first, 0);
    assert_eq!(second, 1);
    assert_eq!(other_partition, 0);
    assert_eq!(log.high_water_mark(0).await.unwrap(), 2);
    assert_eq!(log.high_water_mark(2).await.unwrap(), 0);
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_poll_returns_records_from_offset_in_order(pool: PgPool) {
    setup(&pool).await;
    let log = PgEventLog::new(pool, &EventStoreConfig::default());
    for key in ["a", "b", "c"] {
        log.append(0, record(key)).await.unwrap();
    }

    let batch = log.poll(0, 1, Duration::from_millis(50)).await.unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].offset, 1);
    assert_eq!(batch[0].record, record("b"));
    assert_eq!(batch[1].offset, 2);
    assert_eq!(batch[1].partition, 0);
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_poll_past_end_returns_empty_after_wait(pool: PgPool) {
    setup(&pool).await;
    let log = PgEventLog::new(pool, &EventStoreConfig::default());

    let batch = log.poll(0, 0, Duration::from_millis(30)).await.unwrap();

    assert!(batch.is_empty());
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_unknown_partition_is_rejected(pool: PgPool) {
    setup(&pool).await;
    let log = PgEventLog::new(pool, &EventStoreConfig::default());

    let result = log.append(7, record("a")).await;

    assert!(result.is_err());
}

// --- snapshots ---

#[sqlx::test(migrations = false)]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_latest_snapshot_is_highest_version(pool: PgPool) {
    // Arrange
    setup(&pool).await;
    let store = PgSnapshotStore::new(pool);
    let account_id = Uuid::new_v4();
    store.save(&snapshot(account_id, 5, 4)).await.unwrap();
    let newest = snapshot(account_id, 10, 9);
    store.save(&newest).await.unwrap();
    store.save(&snapshot(Uuid::new_v4(), 15, 20)).await.unwrap();

    // Act
    let latest = store.get_latest(account_id).await.unwrap();

    // Assert
    assert_eq!(latest, Some(newest));
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_no_snapshot_for_unknown_account(pool: PgPool) {
    setup(&pool).await;
    let store = PgSnapshotStore::new(pool);

    let latest = store.get_latest(Uuid::new_v4()).await.unwrap();

    assert!(latest.is_none());
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_snapshot_balance_keeps_full_precision(pool: PgPool) {
    // Arrange
    setup(&pool).await;
    let store = PgSnapshotStore::new(pool);
    let tiny = SnapshotRecord {
        balance: Decimal::new(1, 5),
        ..snapshot(Uuid::new_v4(), 2, 1)
    };
    let huge = SnapshotRecord {
        balance: Decimal::from_i128_with_scale(123_456_789_012_345_678_901_234_567, 5),
        ..snapshot(Uuid::new_v4(), 2, 3)
    };

    // Act
    store.save(&tiny).await.unwrap();
    store.save(&huge).await.unwrap();

    // Assert
    let tiny_back = store.get_latest(tiny.account_id).await.unwrap().unwrap();
    let huge_back = store.get_latest(huge.account_id).await.unwrap().unwrap();
    assert_eq!(tiny_back.balance, Decimal::new(1, 5));
    assert_eq!(huge_back.balance, huge.balance);
}

// --- read model ---

#[sqlx::test(migrations = false)]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_save_upserts_projection_row(pool: PgPool) {
    // Arrange
    setup(&pool).await;
    let repo = PgProjectionRepository::new(pool);
    let account_id = Uuid::new_v4();
    let mut row = ProjectionRow {
        account_id,
        account_name: "Alice".to_owned(),
        balance: Decimal::new(100, 0),
        version: 1,
    };
    repo.save(&row).await.unwrap();

    // Act
    row.balance = Decimal::new(150, 0);
    row.version = 2;
    repo.save(&row).await.unwrap();

    // Assert
    let stored = repo.find_by_id(account_id).await.unwrap().unwrap();
    assert_eq!(stored.balance, Decimal::new(150, 0));
    assert_eq!(stored.version, 2);
    assert_eq!(stored.account_name, "Alice");
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_projection_balance_keeps_full_precision(pool: PgPool) {
    // Arrange
    setup(&pool).await;
    let repo = PgProjectionRepository::new(pool);
    let rows = [Decimal::new(123_456_789, 8), Decimal::new(1_000_000_000_000_000_001, 3)].map(
        |balance| ProjectionRow {
            account_id: Uuid::new_v4(),
            account_name: "Alice".to_owned(),
            balance,
            version: 2,
        },
    );

    // Act
    for row in &rows {
        repo.save(row).await.unwrap();
    }

    // Assert
    for row in &rows {
        let stored = repo.find_by_id(row.account_id).await.unwrap().unwrap();
        assert_eq!(stored.balance, row.balance);
    }
}

// --- consumer offsets ---

#[sqlx::test(migrations = false)]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_commit_overwrites_previous_offset(pool: PgPool) {
    setup(&pool).await;
    let store = PgConsumerOffsetStore::new(pool, "account-events");

    assert_eq!(store.committed("projector", 0).await.unwrap(), None);
    store.commit("projector", 0, 3).await.unwrap();
    store.commit("projector", 0, 8).await.unwrap();

    assert_eq!(store.committed("projector", 0).await.unwrap(), Some(8));
    assert_eq!(store.committed("other-group", 0).await.unwrap(), None);
}
