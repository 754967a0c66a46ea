//! Aggregate roots for the bank account context.

use bank_core::aggregate::{AggregateRoot, Uncommitted};
use bank_core::error::DomainError;
use bank_core::event::{BaseEvent, Clock};
use uuid::Uuid;

use super::commands::{CreateAccount, DepositMoney, WithdrawMoney};
use super::events::{
    AccountCreated, AccountEvent, AccountEventKind, MoneyDeposited, MoneyWithdrawn,
};
use super::money::Money;
use super::snapshot::AccountSnapshot;

/// The aggregate root for a bank account.
///
/// A fresh `Account` is uninitialized: it has no identity and version 0.
/// Applying an `AccountCreated` event makes it active. Command methods never
/// mutate the receiver; they return the next state together with the events
/// that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    id: Option<Uuid>,
    name: String,
    balance: Money,
    version: i64,
}

impl Account {
    /// Creates an uninitialized account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account identifier, once created.
    #[must_use]
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Account holder name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current balance.
    #[must_use]
    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Opens a new account with a fresh identity and a zero balance.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if the holder name is empty.
    pub fn create(
        command: &CreateAccount,
        clock: &dyn Clock,
    ) -> Result<Uncommitted<Self>, DomainError> {
        if command.holder_name.is_empty() {
            return Err(DomainError::InvalidOperation(
                "account holder name cannot be empty".to_owned(),
            ));
        }
        let event = AccountEvent {
            base: BaseEvent::new(Uuid::new_v4(), 0, clock),
            kind: AccountEventKind::AccountCreated(AccountCreated {
                holder_name: command.holder_name.clone(),
                initial_balance: Money::zero(),
            }),
        };
        Self::new().record(event)
    }

    /// Deposits money, producing a `MoneyDeposited` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if the command targets another
    /// account, or the `Money` error if the amount is rejected.
    pub fn deposit(
        &self,
        command: &DepositMoney,
        clock: &dyn Clock,
    ) -> Result<Uncommitted<Self>, DomainError> {
        let account_id = self.owning(command.account_id, "deposit")?;
        let event = AccountEvent {
            base: BaseEvent::new(account_id, self.version, clock),
            kind: AccountEventKind::MoneyDeposited(MoneyDeposited {
                amount: command.amount,
            }),
        };
        self.clone().record(event)
    }

    /// Withdraws money, producing a `MoneyWithdrawn` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if the command targets another
    /// account, and `DomainError::InsufficientFunds` if the balance is too low.
    pub fn withdraw(
        &self,
        command: &WithdrawMoney,
        clock: &dyn Clock,
    ) -> Result<Uncommitted<Self>, DomainError> {
        let account_id = self.owning(command.account_id, "withdraw")?;
        let event = AccountEvent {
            base: BaseEvent::new(account_id, self.version, clock),
            kind: AccountEventKind::MoneyWithdrawn(MoneyWithdrawn {
                amount: command.amount,
            }),
        };
        self.clone().record(event)
    }

    /// Rebuilds an account by replaying `history` onto an uninitialized one.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while applying an event.
    pub fn from_history(history: &[AccountEvent]) -> Result<Self, DomainError> {
        let mut account = Self::new();
        account.replay_events(history)?;
        Ok(account)
    }

    /// Restores an account from a snapshot without replaying anything.
    #[must_use]
    pub fn from_snapshot(snapshot: &AccountSnapshot) -> Self {
        Self {
            id: Some(snapshot.account_id),
            name: snapshot.account_name.clone(),
            balance: snapshot.balance,
            version: snapshot.version,
        }
    }

    fn owning(&self, account_id: Uuid, operation: &str) -> Result<Uuid, DomainError> {
        match self.id {
            Some(id) if id == account_id => Ok(id),
            _ => Err(DomainError::InvalidOperation(format!(
                "{operation} command for account {account_id} does not belong to this account"
            ))),
        }
    }

    fn require_active(&self, event: &AccountEvent) -> Result<(), DomainError> {
        if self.id.is_none() {
            return Err(DomainError::InvalidOperation(format!(
                "cannot apply a money event to uninitialized account {}",
                event.base.aggregate_id
            )));
        }
        Ok(())
    }

    fn record(mut self, event: AccountEvent) -> Result<Uncommitted<Self>, DomainError> {
        self.apply(&event)?;
        Ok(Uncommitted::new(self, vec![event]))
    }
}

impl AggregateRoot for Account {
    type Event = AccountEvent;

    fn aggregate_id(&self) -> Option<Uuid> {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) -> Result<(), DomainError> {
        match &event.kind {
            AccountEventKind::AccountCreated(created) => {
                self.id = Some(event.base.aggregate_id);
                self.name.clone_from(&created.holder_name);
                self.balance = created.initial_balance;
            }
            AccountEventKind::MoneyDeposited(deposited) => {
                self.require_active(event)?;
                self.balance = self.balance.deposit(deposited.amount.amount())?;
            }
            AccountEventKind::MoneyWithdrawn(withdrawn) => {
                self.require_active(event)?;
                self.balance = self.balance.withdraw(withdrawn.amount.amount())?;
            }
        }
        self.version = event.base.aggregate_version + 1;
        Ok(())
    }
}
