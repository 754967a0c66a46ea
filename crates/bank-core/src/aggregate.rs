//! Aggregate root abstraction.

use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;

/// Trait for aggregate roots that reconstitute from event history.
pub trait AggregateRoot: Send + Sync + Sized {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate identifier, or `None` before creation.
    fn aggregate_id(&self) -> Option<Uuid>;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Folds one event into the aggregate's state.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` if the event cannot be applied to the current state.
    fn apply(&mut self, event: &Self::Event) -> Result<(), DomainError>;

    /// Applies each event of `history` in order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first `apply` failure.
    fn replay_events(&mut self, history: &[Self::Event]) -> Result<(), DomainError> {
        for event in history {
            self.apply(event)?;
        }
        Ok(())
    }
}

/// New aggregate state together with the events that produced it, which have
/// not been persisted yet.
///
/// Returned by command methods instead of accumulating changes inside the
/// aggregate. Callers append [`Uncommitted::changes`] and then call
/// [`Uncommitted::mark_committed`] to get the aggregate back.
#[derive(Debug)]
#[must_use = "uncommitted changes are lost unless persisted"]
pub struct Uncommitted<A: AggregateRoot> {
    aggregate: A,
    changes: Vec<A::Event>,
}

impl<A: AggregateRoot> Uncommitted<A> {
    /// Wraps `aggregate` with the `changes` that were applied to reach it.
    pub fn new(aggregate: A, changes: Vec<A::Event>) -> Self {
        Self { aggregate, changes }
    }

    /// The aggregate state after all changes were applied.
    pub fn aggregate(&self) -> &A {
        &self.aggregate
    }

    /// The events pending persistence, in the order they were applied.
    pub fn changes(&self) -> &[A::Event] {
        &self.changes
    }

    /// Drops the pending changes once the caller has durably persisted them.
    pub fn mark_committed(self) -> A {
        self.aggregate
    }
}
