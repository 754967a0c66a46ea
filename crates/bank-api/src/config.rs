//! Process configuration read from environment variables.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use bank_core::config::EventStoreConfig;

use crate::error::AppError;

/// Everything the binary needs to wire the service together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Interface the HTTP listener binds to.
    pub host: String,
    /// Port the HTTP listener binds to.
    pub port: u16,
    /// Event topic topology and replay tuning.
    pub event_store: EventStoreConfig,
    /// Snapshot every N versions; 0 disables snapshots.
    pub snapshot_frequency: u32,
    /// Whether this process also runs the projection consumer.
    pub projector_enabled: bool,
    /// Consumer group the projector commits its offsets under.
    pub projector_group_id: String,
}

impl ServiceConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".to_owned())
            })?;

        let defaults = EventStoreConfig::default();
        let event_store = EventStoreConfig {
            topic: lookup("EVENT_TOPIC").unwrap_or(defaults.topic),
            partitions: positive(&lookup, "EVENT_TOPIC_PARTITIONS", defaults.partitions)?,
            poll_timeout: Duration::from_millis(parse_or(
                &lookup,
                "REPLAY_POLL_TIMEOUT_MS",
                u64::try_from(defaults.poll_timeout.as_millis()).unwrap_or(u64::MAX),
            )?),
            max_polls: positive(&lookup, "REPLAY_MAX_POLLS", defaults.max_polls)?,
            max_consecutive_empty_polls: positive(
                &lookup,
                "REPLAY_MAX_EMPTY_POLLS",
                defaults.max_consecutive_empty_polls,
            )?,
            max_poll_records: defaults.max_poll_records,
            detect_truncation: parse_or(
                &lookup,
                "REPLAY_DETECT_TRUNCATION",
                defaults.detect_truncation,
            )?,
        };

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse_or(&lookup, "PORT", 3000)?,
            event_store,
            snapshot_frequency: parse_or(&lookup, "SNAPSHOT_FREQUENCY", 0)?,
            projector_enabled: parse_or(&lookup, "PROJECTOR_ENABLED", true)?,
            projector_group_id: lookup("PROJECTOR_GROUP_ID")
                .unwrap_or_else(|| "account-projector".to_owned()),
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{name} has invalid value {raw:?}: {e}"))),
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u32,
) -> Result<u32, AppError> {
    let value = parse_or(lookup, name, default)?;
    if value == 0 {
        return Err(AppError::Config(format!("{name} must be greater than zero")));
    }
    Ok(value)
}
