//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Abstraction over system time so event timestamps are deterministic in tests.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fields shared by every domain event.
///
/// `aggregate_version` is the version of the aggregate *before* the event is
/// applied: an event carrying version `N` moves the aggregate to `N + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Time the event was created.
    pub timestamp: DateTime<Utc>,
    /// Aggregate version the event was produced against.
    pub aggregate_version: i64,
}

impl BaseEvent {
    /// Creates a base for a brand-new event with a fresh identifier.
    #[must_use]
    pub fn new(aggregate_id: Uuid, aggregate_version: i64, clock: &dyn Clock) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            timestamp: clock.now(),
            aggregate_version,
        }
    }
}

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + Clone + std::fmt::Debug {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;

    /// Returns the shared base fields.
    fn base(&self) -> &BaseEvent;

    /// Serializes the event, base included, to a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EventPersistence` if the payload cannot be encoded.
    fn to_payload(&self) -> Result<serde_json::Value, DomainError>;

    /// Decodes an event previously produced by [`DomainEvent::to_payload`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnsupportedEventType` if `event_type` is not a
    /// kind this event type knows, and `DomainError::EventReplay` if the
    /// payload does not match the kind's shape.
    fn from_payload(event_type: &str, payload: serde_json::Value) -> Result<Self, DomainError>;

    /// The aggregate this event belongs to.
    fn aggregate_id(&self) -> Uuid {
        self.base().aggregate_id
    }

    /// The aggregate version this event was produced against.
    fn aggregate_version(&self) -> i64 {
        self.base().aggregate_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FrozenClock(DateTime<Utc>);

    impl Clock for FrozenClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn test_base_event_uses_clock_and_fresh_ids() {
        // Arrange
        let aggregate_id = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let clock = FrozenClock(now);

        // Act
        let first = BaseEvent::new(aggregate_id, 3, &clock);
        let second = BaseEvent::new(aggregate_id, 3, &clock);

        // Assert
        assert_eq!(first.aggregate_id, aggregate_id);
        assert_eq!(first.aggregate_version, 3);
        assert_eq!(first.timestamp, now);
        assert_ne!(first.event_id, second.event_id);
    }
}
