//! Consumer loop feeding the projector from the event log.
//!
//! The runner behaves like one member of a consumer group: it reads every
//! partition from the group's committed offset and commits `offset + 1`
//! after each record is projected. A failure stops the round without
//! committing the failed record, so it is delivered again on the next round.
//! [`ProjectionRunner::run`] retries rounds that failed on infrastructure
//! with a growing backoff and stops on anything else.

use std::sync::Arc;
use std::time::Duration;

use bank_core::error::{DomainError, ErrorCategory};
use bank_core::log::EventLog;
use bank_core::repository::ConsumerOffsetStore;
use tracing::{debug, error, info, warn};

use super::projector::AccountProjector;

/// Upper bound of the wait between retries of a failed round.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// Drives an [`AccountProjector`] over every partition of the log.
pub struct ProjectionRunner {
    log: Arc<dyn EventLog>,
    offsets: Arc<dyn ConsumerOffsetStore>,
    projector: AccountProjector,
    group_id: String,
    poll_timeout: Duration,
}

impl ProjectionRunner {
    /// Creates a runner for consumer group `group_id`.
    #[must_use]
    pub fn new(
        log: Arc<dyn EventLog>,
        offsets: Arc<dyn ConsumerOffsetStore>,
        projector: AccountProjector,
        group_id: impl Into<String>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            log,
            offsets,
            projector,
            group_id: group_id.into(),
            poll_timeout,
        }
    }

    /// Polls each partition once and projects what it returns.
    ///
    /// Returns the number of records projected.
    ///
    /// # Errors
    ///
    /// Returns the first projection error, or `DomainError::Projection` if the
    /// log or the offset store fails. Records after the failing one are left
    /// for the next round.
    pub async fn run_once(&self) -> Result<usize, DomainError> {
        let mut processed = 0;
        for partition in 0..self.log.partition_count() {
            let from_offset = self
                .offsets
                .committed(&self.group_id, partition)
                .await
                .map_err(|e| {
                    DomainError::Projection(format!(
                        "reading committed offset of partition {partition} failed: {e}"
                    ))
                })?
                .unwrap_or(0);

            let batch = self
                .log
                .poll(partition, from_offset, self.poll_timeout)
                .await
                .map_err(|e| {
                    DomainError::Projection(format!("polling partition {partition} failed: {e}"))
                })?;

            for polled in batch {
                if let Err(e) = self.projector.handle_record(&polled).await {
                    error!(
                        group_id = %self.group_id,
                        partition,
                        offset = polled.offset,
                        error = %e,
                        "projection halted"
                    );
                    return Err(e);
                }
                self.offsets
                    .commit(&self.group_id, partition, polled.offset + 1)
                    .await
                    .map_err(|e| {
                        DomainError::Projection(format!(
                            "committing offset {} of partition {partition} failed: {e}",
                            polled.offset + 1
                        ))
                    })?;
                processed += 1;
            }
        }
        if processed > 0 {
            debug!(group_id = %self.group_id, processed, "projection round finished");
        }
        Ok(processed)
    }

    /// Runs rounds until one fails on something other than infrastructure,
    /// sleeping `idle_wait` after rounds that found nothing. Infrastructure
    /// failures are retried, starting at `idle_wait` and doubling up to
    /// [`MAX_RETRY_BACKOFF`]. Returns the error that halted the loop.
    pub async fn run(&self, idle_wait: Duration) -> DomainError {
        info!(group_id = %self.group_id, topic = self.log.topic(), "projection runner started");
        let mut backoff = idle_wait;
        loop {
            match self.run_once().await {
                Ok(processed) => {
                    backoff = idle_wait;
                    if processed == 0 {
                        tokio::time::sleep(idle_wait).await;
                    }
                }
                Err(e) if e.category() == ErrorCategory::Infrastructure => {
                    warn!(
                        group_id = %self.group_id,
                        error = %e,
                        retry_in_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        "projection round failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_RETRY_BACKOFF);
                }
                Err(e) => return e,
            }
        }
    }
}
