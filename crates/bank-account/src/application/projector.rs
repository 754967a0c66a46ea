//! Projection of account events into the relational read model.
//!
//! Delivery is at-least-once, so every event is validated against a rebuild
//! of the account from the log before it is written. A row already at or
//! past the event's resulting version is left untouched.

use std::sync::Arc;

use bank_core::aggregate::AggregateRoot;
use bank_core::error::{DomainError, ErrorCategory};
use bank_core::event::DomainEvent;
use bank_core::log::PolledRecord;
use bank_core::repository::{EventStore, ProjectionRepository, ProjectionRow};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::aggregates::Account;
use crate::domain::events::AccountEvent;

/// What projecting one event did to the read model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionOutcome {
    /// A new row was inserted.
    Created,
    /// An existing row was overwritten.
    Updated,
    /// The row was already at or past this event; nothing was written.
    Duplicate,
}

/// Rebuilds accounts from the log and upserts their read-model rows.
#[derive(Clone)]
pub struct AccountProjector {
    event_store: Arc<dyn EventStore<AccountEvent>>,
    projections: Arc<dyn ProjectionRepository>,
}

impl AccountProjector {
    /// Creates a projector reading from `event_store` and writing to `projections`.
    #[must_use]
    pub fn new(
        event_store: Arc<dyn EventStore<AccountEvent>>,
        projections: Arc<dyn ProjectionRepository>,
    ) -> Self {
        Self {
            event_store,
            projections,
        }
    }

    /// Decodes a log record and projects the event it carries.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnsupportedEventType` for an unknown event kind;
    /// otherwise as [`AccountProjector::handle_event`].
    pub async fn handle_record(
        &self,
        record: &PolledRecord,
    ) -> Result<ProjectionOutcome, DomainError> {
        let event =
            AccountEvent::from_payload(&record.record.event_type, record.record.payload.clone())
                .map_err(|e| wrap(e, &record.record.key, record.offset))?;
        self.handle_event(&event, record.offset).await
    }

    /// Projects `event`, read at log position `offset`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ProjectionVersionMismatch` if the rebuilt account
    /// is not at the event's version, `DomainError::AccountAlreadyExists` if a
    /// non-creation event arrives for an account with no row, any other
    /// consistency error unchanged, and `DomainError::Projection` for every
    /// other failure.
    pub async fn handle_event(
        &self,
        event: &AccountEvent,
        offset: i64,
    ) -> Result<ProjectionOutcome, DomainError> {
        let account_id = event.aggregate_id();
        self.project(event, offset)
            .await
            .map_err(|e| wrap(e, &account_id.to_string(), offset))
    }

    async fn project(
        &self,
        event: &AccountEvent,
        offset: i64,
    ) -> Result<ProjectionOutcome, DomainError> {
        let account_id = event.aggregate_id();
        let expected = event.aggregate_version();

        let mut account = self.restore(account_id, expected).await?;
        if account.version() != expected {
            return Err(DomainError::ProjectionVersionMismatch {
                aggregate_id: account_id,
                expected,
                actual: account.version(),
                offset,
            });
        }

        account.apply(event)?;
        self.save(account_id, &account, offset).await
    }

    async fn restore(&self, account_id: Uuid, target_version: i64) -> Result<Account, DomainError> {
        if target_version == 0 {
            return Ok(Account::new());
        }
        let history = self
            .event_store
            .load_stream_up_to_version(account_id, target_version)
            .await?;
        Account::from_history(&history.events)
    }

    async fn save(
        &self,
        account_id: Uuid,
        account: &Account,
        offset: i64,
    ) -> Result<ProjectionOutcome, DomainError> {
        let version = account.version();
        let existing = self
            .projections
            .find_by_id(account_id)
            .await
            .map_err(|e| DomainError::Projection(format!("reading projection failed: {e}")))?;

        let outcome = match existing {
            Some(row) if row.version >= version => {
                warn!(
                    %account_id,
                    stored_version = row.version,
                    version,
                    offset,
                    "duplicate or stale event, projection unchanged"
                );
                return Ok(ProjectionOutcome::Duplicate);
            }
            Some(_) => ProjectionOutcome::Updated,
            None if version != 1 => {
                return Err(DomainError::AccountAlreadyExists {
                    aggregate_id: account_id,
                    version,
                    offset,
                });
            }
            None => ProjectionOutcome::Created,
        };

        let row = ProjectionRow {
            account_id,
            account_name: account.name().to_owned(),
            balance: account.balance().amount(),
            version,
        };
        self.projections
            .save(&row)
            .await
            .map_err(|e| DomainError::Projection(format!("writing projection failed: {e}")))?;
        debug!(%account_id, version, offset, ?outcome, "projection written");
        Ok(outcome)
    }
}

fn wrap(error: DomainError, key: &str, offset: i64) -> DomainError {
    match error {
        e @ DomainError::Projection(_) => e,
        e if e.category() == ErrorCategory::Consistency => e,
        other => DomainError::Projection(format!(
            "unexpected error projecting record {key} at offset {offset}: {other}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bank_core::config::EventStoreConfig;
    use bank_core::event::BaseEvent;
    use bank_core::log::{EventLog, LogRecord};
    use bank_event_store::LogEventStore;
    use bank_test_support::{
        FailingProjectionRepository, FixedClock, InMemoryEventLog, InMemoryProjectionRepository,
    };
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::commands::{CreateAccount, DepositMoney, WithdrawMoney};
    use crate::domain::money::Money;

    struct Fixture {
        log: Arc<InMemoryEventLog>,
        store: Arc<LogEventStore<AccountEvent>>,
        projections: Arc<InMemoryProjectionRepository>,
        projector: AccountProjector,
    }

    fn fixture() -> Fixture {
        let log = Arc::new(InMemoryEventLog::new(1));
        let store = Arc::new(LogEventStore::new(
            log.clone(),
            EventStoreConfig {
                poll_timeout: Duration::from_millis(1),
                ..EventStoreConfig::default()
            },
        ));
        let projections = Arc::new(InMemoryProjectionRepository::new());
        let projector = AccountProjector::new(store.clone(), projections.clone());
        Fixture {
            log,
            store,
            projections,
            projector,
        }
    }

    fn money(value: i64) -> Money {
        Money::new(Decimal::from(value)).unwrap()
    }

    /// Creation, deposit of 100 and withdrawal of 40, in order.
    fn alice_history() -> Vec<AccountEvent> {
        let clock = FixedClock::default();
        let created = Account::create(
            &CreateAccount {
                correlation_id: Uuid::new_v4(),
                holder_name: "Alice".to_owned(),
            },
            &clock,
        )
        .unwrap();
        let mut history = created.changes().to_vec();
        let account = created.mark_committed();
        let id = account.id().unwrap();
        let deposited = account
            .deposit(
                &DepositMoney {
                    correlation_id: Uuid::new_v4(),
                    account_id: id,
                    amount: money(100),
                },
                &clock,
            )
            .unwrap();
        history.extend_from_slice(deposited.changes());
        let withdrawn = deposited
            .mark_committed()
            .withdraw(
                &WithdrawMoney {
                    correlation_id: Uuid::new_v4(),
                    account_id: id,
                    amount: money(40),
                },
                &clock,
            )
            .unwrap();
        history.extend_from_slice(withdrawn.changes());
        history
    }

    #[tokio::test]
    async fn test_projects_full_history_in_order() {
        // Arrange
        let f = fixture();
        let history = alice_history();
        let id = history[0].aggregate_id();
        f.store.append(id, &history).await.unwrap();

        // Act
        let mut outcomes = Vec::new();
        for (offset, event) in (0..).zip(&history) {
            outcomes.push(f.projector.handle_event(event, offset).await.unwrap());
        }

        // Assert
        assert_eq!(
            outcomes,
            [
                ProjectionOutcome::Created,
                ProjectionOutcome::Updated,
                ProjectionOutcome::Updated
            ]
        );
        let row = f.projections.row(id).unwrap();
        assert_eq!(row.account_name, "Alice");
        assert_eq!(row.balance, Decimal::from(60));
        assert_eq!(row.version, 3);
    }

    #[tokio::test]
    async fn test_redelivered_event_is_idempotent() {
        // Arrange
        let f = fixture();
        let history = alice_history();
        let id = history[0].aggregate_id();
        f.store.append(id, &history).await.unwrap();
        for (offset, event) in (0..).zip(&history) {
            f.projector.handle_event(event, offset).await.unwrap();
        }
        let writes = f.projections.write_count();

        // Act
        let again = f.projector.handle_event(&history[1], 1).await.unwrap();

        // Assert
        assert_eq!(again, ProjectionOutcome::Duplicate);
        assert_eq!(f.projections.write_count(), writes);
        assert_eq!(f.projections.row(id).unwrap().version, 3);
    }

    #[tokio::test]
    async fn test_out_of_order_event_is_version_mismatch() {
        // Arrange: only the version-1 event has reached the log.
        let f = fixture();
        let history = alice_history();
        let id = history[0].aggregate_id();
        f.store.append(id, &history[1..2]).await.unwrap();

        // Act
        let result = f.projector.handle_event(&history[1], 0).await;

        // Assert
        match result {
            Err(DomainError::ProjectionVersionMismatch {
                aggregate_id,
                expected,
                actual,
                offset,
            }) => {
                assert_eq!(aggregate_id, id);
                assert_eq!(expected, 1);
                assert_eq!(actual, 0);
                assert_eq!(offset, 0);
            }
            other => panic!("expected ProjectionVersionMismatch, got {other:?}"),
        }
        assert!(f.projections.row(id).is_none());
    }

    #[tokio::test]
    async fn test_non_creation_event_without_row_is_rejected() {
        let f = fixture();
        let history = alice_history();
        let id = history[0].aggregate_id();
        f.store.append(id, &history).await.unwrap();

        let result = f.projector.handle_event(&history[1], 1).await;

        assert!(matches!(
            result,
            Err(DomainError::AccountAlreadyExists { version: 2, offset: 1, .. })
        ));
        assert_eq!(f.projections.write_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_record_kind_is_unsupported() {
        let f = fixture();
        let record = PolledRecord {
            partition: 0,
            offset: 7,
            record: LogRecord {
                key: Uuid::new_v4().to_string(),
                event_type: "account.closed".to_owned(),
                payload: serde_json::json!({}),
            },
        };

        let result = f.projector.handle_record(&record).await;

        assert!(matches!(result, Err(DomainError::UnsupportedEventType(_))));
    }

    #[tokio::test]
    async fn test_handle_record_decodes_log_payload() {
        // Arrange
        let f = fixture();
        let history = alice_history();
        let id = history[0].aggregate_id();
        f.store.append(id, &history[..1]).await.unwrap();
        let polled = f.log.poll(0, 0, Duration::ZERO).await.unwrap();

        // Act
        let outcome = f.projector.handle_record(&polled[0]).await.unwrap();

        // Assert
        assert_eq!(outcome, ProjectionOutcome::Created);
        assert_eq!(f.projections.row(id).unwrap().balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_read_model_failure_is_projection_failure() {
        let f = fixture();
        let projector = AccountProjector::new(f.store.clone(), Arc::new(FailingProjectionRepository));
        let history = alice_history();

        let result = projector.handle_event(&history[0], 0).await;

        assert!(matches!(result, Err(DomainError::Projection(_))));
    }

    #[tokio::test]
    async fn test_invalid_fold_is_wrapped_as_projection_failure() {
        // Arrange: a withdrawal larger than the rebuilt balance.
        let f = fixture();
        let history = alice_history();
        let id = history[0].aggregate_id();
        f.store.append(id, &history[..1]).await.unwrap();
        f.projector.handle_event(&history[0], 0).await.unwrap();
        let overdraw = AccountEvent {
            base: BaseEvent::new(id, 1, &FixedClock::default()),
            kind: crate::domain::events::AccountEventKind::MoneyWithdrawn(
                crate::domain::events::MoneyWithdrawn { amount: money(5) },
            ),
        };

        // Act
        let result = f.projector.handle_event(&overdraw, 1).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Projection(_))));
        assert_eq!(f.projections.row(id).unwrap().version, 1);
    }
}
