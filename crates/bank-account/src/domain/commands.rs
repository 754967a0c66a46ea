//! Commands for the bank account context.

use bank_core::command::Command;
use uuid::Uuid;

use super::money::Money;

/// Command to open a new account.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Name of the account holder.
    pub holder_name: String,
}

/// Command to pay money into an account.
#[derive(Debug, Clone)]
pub struct DepositMoney {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target account.
    pub account_id: Uuid,
    /// Amount to deposit.
    pub amount: Money,
}

/// Command to take money out of an account.
#[derive(Debug, Clone)]
pub struct WithdrawMoney {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target account.
    pub account_id: Uuid,
    /// Amount to withdraw.
    pub amount: Money,
}

impl Command for CreateAccount {
    fn command_type(&self) -> &'static str {
        "account.create"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for DepositMoney {
    fn command_type(&self) -> &'static str {
        "account.deposit"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for WithdrawMoney {
    fn command_type(&self) -> &'static str {
        "account.withdraw"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_commands_report_type_and_correlation_id() {
        // Arrange
        let correlation_id = Uuid::new_v4();
        let amount = Money::new(Decimal::from(10)).unwrap();
        let account_id = Uuid::new_v4();
        let commands: [Box<dyn Command>; 3] = [
            Box::new(CreateAccount {
                correlation_id,
                holder_name: "Alice".to_owned(),
            }),
            Box::new(DepositMoney {
                correlation_id,
                account_id,
                amount,
            }),
            Box::new(WithdrawMoney {
                correlation_id,
                account_id,
                amount,
            }),
        ];

        // Act
        let types: Vec<&str> = commands.iter().map(|c| c.command_type()).collect();

        // Assert
        assert_eq!(types, ["account.create", "account.deposit", "account.withdraw"]);
        assert!(commands.iter().all(|c| c.correlation_id() == correlation_id));
    }
}
