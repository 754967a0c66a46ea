//! Database schema for the log, snapshots, read model and consumer offsets.

use sqlx::PgPool;

/// SQL to create the partitioned event log.
pub const CREATE_EVENT_LOG_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS event_log (
    topic        VARCHAR(255) NOT NULL,
    partition_id INTEGER NOT NULL,
    log_offset   BIGINT NOT NULL,
    record_key   VARCHAR(255) NOT NULL,
    event_type   VARCHAR(255) NOT NULL,
    payload      JSONB NOT NULL,
    appended_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (topic, partition_id, log_offset)
);
";

/// SQL to create the snapshot table. Older snapshots are kept.
pub const CREATE_SNAPSHOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS account_snapshots (
    id         UUID PRIMARY KEY,
    account_id UUID NOT NULL,
    name       VARCHAR(255) NOT NULL,
    balance    NUMERIC NOT NULL,
    version    BIGINT NOT NULL,
    log_offset BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_account_snapshots_account_version
    ON account_snapshots (account_id, version DESC);
";

/// SQL to create the account read model.
pub const CREATE_ACCOUNTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    id      UUID PRIMARY KEY,
    name    VARCHAR(255) NOT NULL,
    balance NUMERIC NOT NULL,
    version BIGINT NOT NULL
);
";

/// SQL to create the committed consumer offsets table.
pub const CREATE_CONSUMER_OFFSETS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS consumer_offsets (
    group_id     VARCHAR(255) NOT NULL,
    topic        VARCHAR(255) NOT NULL,
    partition_id INTEGER NOT NULL,
    next_offset  BIGINT NOT NULL,
    PRIMARY KEY (group_id, topic, partition_id)
);
";

/// Creates every table that does not exist yet.
///
/// # Errors
///
/// Returns the underlying `sqlx::Error` if a statement fails.
pub async fn apply(pool: &PgPool) -> Result<(), sqlx::Error> {
    for ddl in [
        CREATE_EVENT_LOG_TABLE,
        CREATE_SNAPSHOTS_TABLE,
        CREATE_ACCOUNTS_TABLE,
        CREATE_CONSUMER_OFFSETS_TABLE,
    ] {
        sqlx::raw_sql(ddl).execute(pool).await?;
    }
    Ok(())
}
