//! Point-in-time account snapshots.

use bank_core::aggregate::AggregateRoot;
use bank_core::error::DomainError;
use bank_core::repository::SnapshotRecord;
use uuid::Uuid;

use super::aggregates::Account;
use super::money::Money;

/// An account's state together with the log offset of the last event folded
/// into it. Replay resumes right after `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// The account.
    pub account_id: Uuid,
    /// Account holder name.
    pub account_name: String,
    /// Balance at the snapshot.
    pub balance: Money,
    /// Aggregate version at the snapshot.
    pub version: i64,
    /// Log offset of the last event included.
    pub offset: i64,
}

impl AccountSnapshot {
    /// Captures `account` as of log position `offset`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if the account was never created.
    pub fn capture(account: &Account, offset: i64) -> Result<Self, DomainError> {
        let account_id = account.id().ok_or_else(|| {
            DomainError::InvalidOperation("cannot snapshot an uninitialized account".to_owned())
        })?;
        Ok(Self {
            account_id,
            account_name: account.name().to_owned(),
            balance: account.balance(),
            version: account.version(),
            offset,
        })
    }

    /// Converts into a storable record with a fresh synthetic id.
    #[must_use]
    pub fn into_record(self) -> SnapshotRecord {
        SnapshotRecord {
            id: Uuid::new_v4(),
            account_id: self.account_id,
            account_name: self.account_name,
            balance: self.balance.amount(),
            version: self.version,
            offset: self.offset,
        }
    }
}

impl TryFrom<SnapshotRecord> for AccountSnapshot {
    type Error = DomainError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let balance = Money::new(record.balance).map_err(|e| {
            DomainError::Snapshot(format!("snapshot {} is unusable: {e}", record.id))
        })?;
        Ok(Self {
            account_id: record.account_id,
            account_name: record.account_name,
            balance,
            version: record.version,
            offset: record.offset,
        })
    }
}
