//! Domain events for the bank account context.
//!
//! On the log every event is a JSON object `{"base": …, "data": …}` where
//! `data` is the payload of the event's kind. The record's event type names
//! the kind, so the payload itself carries no tag.

use bank_core::error::DomainError;
use bank_core::event::{BaseEvent, DomainEvent};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// Event type of [`AccountCreated`].
pub const ACCOUNT_CREATED_EVENT_TYPE: &str = "account.created";
/// Event type of [`MoneyDeposited`].
pub const MONEY_DEPOSITED_EVENT_TYPE: &str = "account.money_deposited";
/// Event type of [`MoneyWithdrawn`].
pub const MONEY_WITHDRAWN_EVENT_TYPE: &str = "account.money_withdrawn";

/// Emitted when an account is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreated {
    /// Name of the account holder.
    pub holder_name: String,
    /// Opening balance.
    pub initial_balance: Money,
}

/// Emitted when money is paid into an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyDeposited {
    /// Amount deposited.
    pub amount: Money,
}

/// Emitted when money is taken out of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyWithdrawn {
    /// Amount withdrawn.
    pub amount: Money,
}

/// Event payload variants for the bank account context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEventKind {
    /// An account has been opened.
    AccountCreated(AccountCreated),
    /// Money has been deposited.
    MoneyDeposited(MoneyDeposited),
    /// Money has been withdrawn.
    MoneyWithdrawn(MoneyWithdrawn),
}

/// Domain event envelope for the bank account context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEvent {
    /// Shared event fields.
    pub base: BaseEvent,
    /// Event-specific payload.
    pub kind: AccountEventKind,
}

#[derive(Serialize)]
struct WireOut<'a, T> {
    base: &'a BaseEvent,
    data: &'a T,
}

#[derive(Deserialize)]
struct WireIn<T> {
    base: BaseEvent,
    data: T,
}

fn encode<T: Serialize>(base: &BaseEvent, data: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(WireOut { base, data })
        .map_err(|e| DomainError::EventPersistence(format!("event serialization failed: {e}")))
}

fn decode<T: DeserializeOwned>(
    event_type: &str,
    payload: serde_json::Value,
) -> Result<(BaseEvent, T), DomainError> {
    let wire: WireIn<T> = serde_json::from_value(payload).map_err(|e| {
        DomainError::EventReplay(format!("{event_type} payload could not be decoded: {e}"))
    })?;
    Ok((wire.base, wire.data))
}

impl DomainEvent for AccountEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            AccountEventKind::AccountCreated(_) => ACCOUNT_CREATED_EVENT_TYPE,
            AccountEventKind::MoneyDeposited(_) => MONEY_DEPOSITED_EVENT_TYPE,
            AccountEventKind::MoneyWithdrawn(_) => MONEY_WITHDRAWN_EVENT_TYPE,
        }
    }

    fn base(&self) -> &BaseEvent {
        &self.base
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        match &self.kind {
            AccountEventKind::AccountCreated(data) => encode(&self.base, data),
            AccountEventKind::MoneyDeposited(data) => encode(&self.base, data),
            AccountEventKind::MoneyWithdrawn(data) => encode(&self.base, data),
        }
    }

    fn from_payload(event_type: &str, payload: serde_json::Value) -> Result<Self, DomainError> {
        let (base, kind) = match event_type {
            ACCOUNT_CREATED_EVENT_TYPE => {
                let (base, data) = decode(event_type, payload)?;
                (base, AccountEventKind::AccountCreated(data))
            }
            MONEY_DEPOSITED_EVENT_TYPE => {
                let (base, data) = decode(event_type, payload)?;
                (base, AccountEventKind::MoneyDeposited(data))
            }
            MONEY_WITHDRAWN_EVENT_TYPE => {
                let (base, data) = decode(event_type, payload)?;
                (base, AccountEventKind::MoneyWithdrawn(data))
            }
            other => return Err(DomainError::UnsupportedEventType(other.to_owned())),
        };
        Ok(Self { base, kind })
    }
}
