//! Shared application state.

use std::sync::Arc;

use bank_account::application::command_handlers::{CommandContext, SnapshotPolicy};
use bank_account::domain::events::AccountEvent;
use bank_core::event::Clock;
use bank_core::repository::{EventStore, SnapshotStore};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock stamping new events.
    pub clock: Arc<dyn Clock>,
    /// Event store holding the account streams.
    pub event_store: Arc<dyn EventStore<AccountEvent>>,
    /// Store for point-in-time account snapshots.
    pub snapshot_store: Arc<dyn SnapshotStore>,
    /// When the orchestrator takes a snapshot.
    pub snapshot_policy: SnapshotPolicy,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        event_store: Arc<dyn EventStore<AccountEvent>>,
        snapshot_store: Arc<dyn SnapshotStore>,
        snapshot_policy: SnapshotPolicy,
    ) -> Self {
        Self {
            clock,
            event_store,
            snapshot_store,
            snapshot_policy,
        }
    }

    /// Borrows the state as the context the command handlers run against.
    #[must_use]
    pub fn command_context(&self) -> CommandContext<'_> {
        CommandContext {
            clock: self.clock.as_ref(),
            event_store: self.event_store.as_ref(),
            snapshot_store: self.snapshot_store.as_ref(),
            snapshot_policy: self.snapshot_policy,
        }
    }
}
