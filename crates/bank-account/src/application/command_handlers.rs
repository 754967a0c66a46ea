//! Command handlers for the bank account context.
//!
//! Each handler loads the account (latest snapshot plus the events after it,
//! or the full stream), runs the command against it, appends the resulting
//! events and, for money commands, takes a snapshot when the new version
//! falls on the configured cadence.
//!
//! Appends are not conditioned on the version that was read: two commands
//! racing on the same account can both append against the same base version.
//! Reads detect the resulting version clash as an inconsistent stream.

use bank_core::aggregate::{AggregateRoot, Uncommitted};
use bank_core::command::Command;
use bank_core::error::DomainError;
use bank_core::event::Clock;
use bank_core::repository::{EventStore, SnapshotStore};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::aggregates::Account;
use crate::domain::commands::{CreateAccount, DepositMoney, WithdrawMoney};
use crate::domain::events::AccountEvent;
use crate::domain::snapshot::AccountSnapshot;

/// How often a snapshot is taken after a money command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPolicy {
    /// Never snapshot.
    Never,
    /// Snapshot whenever the new version is a multiple of the given count.
    Every(u32),
}

impl SnapshotPolicy {
    /// Builds the policy from a cadence where 0 disables snapshots.
    #[must_use]
    pub fn from_frequency(frequency: u32) -> Self {
        if frequency == 0 {
            Self::Never
        } else {
            Self::Every(frequency)
        }
    }

    fn is_due(self, version: i64) -> bool {
        match self {
            Self::Never | Self::Every(0) => false,
            Self::Every(n) => version > 0 && version % i64::from(n) == 0,
        }
    }
}

/// Collaborators shared by every command handler.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    /// Source of event timestamps.
    pub clock: &'a dyn Clock,
    /// Durable event log.
    pub event_store: &'a dyn EventStore<AccountEvent>,
    /// Snapshot storage.
    pub snapshot_store: &'a dyn SnapshotStore,
    /// Snapshot cadence.
    pub snapshot_policy: SnapshotPolicy,
}

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct AccountCommandResult {
    /// The account affected by the command.
    pub account_id: Uuid,
    /// Account version after the command.
    pub version: i64,
    /// Log offset of the last event written.
    pub last_offset: Option<i64>,
    /// The events produced and persisted.
    pub events: Vec<AccountEvent>,
    /// Whether a snapshot was saved after the append.
    pub snapshot_taken: bool,
}

/// Loads an account from its latest snapshot plus the events after it, or
/// from its full stream when no snapshot exists.
///
/// Returns `None` when the account has no events.
///
/// # Errors
///
/// Returns `DomainError::Snapshot` if the snapshot store fails, and any
/// event store or replay error unchanged.
pub async fn load_account(
    account_id: Uuid,
    ctx: &CommandContext<'_>,
) -> Result<Option<Account>, DomainError> {
    let snapshot = ctx
        .snapshot_store
        .get_latest(account_id)
        .await
        .map_err(|e| {
            DomainError::Snapshot(format!("loading snapshot of account {account_id} failed: {e}"))
        })?;

    if let Some(record) = snapshot {
        let snapshot = AccountSnapshot::try_from(record)?;
        let tail = ctx
            .event_store
            .load_stream_after(account_id, snapshot.offset, snapshot.version)
            .await?;
        let mut account = Account::from_snapshot(&snapshot);
        account.replay_events(&tail.events)?;
        debug!(
            %account_id,
            snapshot_version = snapshot.version,
            tail = tail.len(),
            "account loaded from snapshot"
        );
        return Ok(Some(account));
    }

    let stream = ctx.event_store.load_full_stream(account_id).await?;
    if stream.is_empty() {
        return Ok(None);
    }
    let account = Account::from_history(&stream.events)?;
    debug!(%account_id, events = stream.len(), "account loaded from full stream");
    Ok(Some(account))
}

/// Handles the `CreateAccount` command: builds the account and persists its
/// creation event.
///
/// # Errors
///
/// Returns `DomainError::InvalidOperation` for an empty holder name and
/// `DomainError::EventPersistence` if the append fails.
pub async fn handle_create_account(
    command: &CreateAccount,
    ctx: &CommandContext<'_>,
) -> Result<AccountCommandResult, DomainError> {
    let uncommitted = Account::create(command, ctx.clock)?;
    commit(command, uncommitted, ctx, false).await
}

/// Handles the `DepositMoney` command.
///
/// # Errors
///
/// Returns `DomainError::AccountNotFound` if the account has no events, the
/// aggregate's error if the deposit is rejected, and any load, append or
/// snapshot failure.
pub async fn handle_deposit_money(
    command: &DepositMoney,
    ctx: &CommandContext<'_>,
) -> Result<AccountCommandResult, DomainError> {
    let account = load_account(command.account_id, ctx)
        .await?
        .ok_or(DomainError::AccountNotFound(command.account_id))?;
    let uncommitted = account.deposit(command, ctx.clock)?;
    commit(command, uncommitted, ctx, true).await
}

/// Handles the `WithdrawMoney` command.
///
/// # Errors
///
/// Returns `DomainError::AccountNotFound` if the account has no events,
/// `DomainError::InsufficientFunds` if the balance is too low, and any load,
/// append or snapshot failure. Nothing is appended when the withdrawal is
/// rejected.
pub async fn handle_withdraw_money(
    command: &WithdrawMoney,
    ctx: &CommandContext<'_>,
) -> Result<AccountCommandResult, DomainError> {
    let account = load_account(command.account_id, ctx)
        .await?
        .ok_or(DomainError::AccountNotFound(command.account_id))?;
    let uncommitted = account.withdraw(command, ctx.clock)?;
    commit(command, uncommitted, ctx, true).await
}

async fn commit(
    command: &dyn Command,
    uncommitted: Uncommitted<Account>,
    ctx: &CommandContext<'_>,
    snapshot_eligible: bool,
) -> Result<AccountCommandResult, DomainError> {
    let account_id = uncommitted.aggregate().id().ok_or_else(|| {
        DomainError::InvalidOperation("command produced an account without identity".to_owned())
    })?;
    let events = uncommitted.changes().to_vec();
    let last_offset = ctx.event_store.append(account_id, &events).await?;
    let account = uncommitted.mark_committed();

    let mut snapshot_taken = false;
    if let Some(offset) = last_offset.filter(|_| snapshot_eligible) {
        if ctx.snapshot_policy.is_due(account.version()) {
            let record = AccountSnapshot::capture(&account, offset)?.into_record();
            ctx.snapshot_store.save(&record).await.map_err(|e| {
                DomainError::Snapshot(format!(
                    "saving snapshot of account {account_id} at version {} failed: {e}",
                    account.version()
                ))
            })?;
            snapshot_taken = true;
            info!(%account_id, version = account.version(), offset, "snapshot taken");
        }
    }

    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
        %account_id,
        version = account.version(),
        ?last_offset,
        "command handled"
    );

    Ok(AccountCommandResult {
        account_id,
        version: account.version(),
        last_offset,
        events,
        snapshot_taken,
    })
}
