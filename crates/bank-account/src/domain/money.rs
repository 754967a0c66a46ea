//! Non-negative monetary amounts.

use std::fmt;

use bank_core::error::DomainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount that is never negative.
///
/// Every operation returns a new value; a `Money` is never mutated in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Wraps `amount`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NegativeAmount` if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount < Decimal::ZERO {
            return Err(DomainError::NegativeAmount(format!(
                "amount cannot be negative: {amount}"
            )));
        }
        Ok(Self(amount))
    }

    /// Wraps an amount that may be absent.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NegativeAmount` if `amount` is `None` or negative.
    pub fn from_optional(amount: Option<Decimal>) -> Result<Self, DomainError> {
        amount
            .ok_or_else(|| DomainError::NegativeAmount("amount must be provided".to_owned()))
            .and_then(Self::new)
    }

    /// Zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The wrapped amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Returns this amount increased by `amount`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NegativeAmount` if `amount` is negative.
    pub fn deposit(self, amount: Decimal) -> Result<Self, DomainError> {
        let amount = Self::new(amount)?;
        Self::new(self.0 + amount.0)
    }

    /// Returns this amount decreased by `amount`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NegativeAmount` if `amount` is negative, and
    /// `DomainError::InsufficientFunds` if it exceeds this amount.
    pub fn withdraw(self, amount: Decimal) -> Result<Self, DomainError> {
        let amount = Self::new(amount)?;
        if amount.0 > self.0 {
            return Err(DomainError::InsufficientFunds {
                available: self.0,
                requested: amount.0,
            });
        }
        Self::new(self.0 - amount.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
