//! Event store over a partitioned log.
//!
//! Appends route every event of an aggregate to one partition. Reads scan
//! that partition from an offset, keep the records keyed by the aggregate,
//! and enforce that their versions are strictly consecutive.
//!
//! The log has no end-of-stream signal, so a read polls in rounds and stops
//! after `max_polls` rounds or `max_consecutive_empty_polls` empty rounds in
//! a row. With `detect_truncation` enabled, the partition's high-water mark is
//! sampled before reading and a read that stops short of it fails instead of
//! returning a truncated stream.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use bank_core::config::EventStoreConfig;
use bank_core::error::{DomainError, InfrastructureError};
use bank_core::event::DomainEvent;
use bank_core::log::{EventLog, LogRecord};
use bank_core::repository::{EventStore, EventStream};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::partition::partition_for_key;

/// Where a replay starts and when it may stop early.
#[derive(Debug, Clone, Copy)]
struct ReplayPlan {
    start_offset: i64,
    initial_version: i64,
    target_version_exclusive: Option<i64>,
}

/// `EventStore` backed by any `EventLog`.
pub struct LogEventStore<E> {
    log: Arc<dyn EventLog>,
    config: EventStoreConfig,
    _events: PhantomData<fn() -> E>,
}

impl<E: DomainEvent> LogEventStore<E> {
    /// Creates a store reading and writing through `log`.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>, config: EventStoreConfig) -> Self {
        Self {
            log,
            config,
            _events: PhantomData,
        }
    }

    /// The partition holding every event of `aggregate_id`.
    #[must_use]
    pub fn partition_for(&self, aggregate_id: Uuid) -> u32 {
        partition_for_key(&aggregate_id.to_string(), self.log.partition_count())
    }

    async fn replay(
        &self,
        aggregate_id: Uuid,
        plan: ReplayPlan,
    ) -> Result<EventStream<E>, DomainError> {
        let partition = self.partition_for(aggregate_id);
        let key = aggregate_id.to_string();
        let replay_failure = |e: InfrastructureError| {
            DomainError::EventReplay(format!(
                "replay of aggregate {aggregate_id} from partition {partition} failed: {e}"
            ))
        };

        let high_water_mark = if self.config.detect_truncation {
            Some(
                self.log
                    .high_water_mark(partition)
                    .await
                    .map_err(replay_failure)?,
            )
        } else {
            None
        };

        let mut events = Vec::new();
        let mut position = plan.start_offset;
        let mut last_read_offset = (plan.start_offset > 0).then(|| plan.start_offset - 1);
        let mut current_version = plan.initial_version;
        let mut polls = 0;
        let mut empty_polls = 0;

        while polls < self.config.max_polls && empty_polls < self.config.max_consecutive_empty_polls
        {
            let batch = self
                .log
                .poll(partition, position, self.config.poll_timeout)
                .await
                .map_err(replay_failure)?;
            polls += 1;

            if batch.is_empty() {
                empty_polls += 1;
                continue;
            }
            empty_polls = 0;

            for polled in batch {
                position = polled.offset + 1;
                if polled.record.key != key {
                    continue;
                }

                let event = E::from_payload(&polled.record.event_type, polled.record.payload)?;
                if event.aggregate_id() != aggregate_id {
                    continue;
                }

                let version = event.aggregate_version();
                if plan
                    .target_version_exclusive
                    .is_some_and(|target| version >= target)
                {
                    return Ok(EventStream {
                        events,
                        partition,
                        last_read_offset,
                        resulting_version: current_version,
                    });
                }
                if version != current_version {
                    return Err(DomainError::InconsistentEventStream {
                        aggregate_id,
                        expected: current_version,
                        actual: version,
                        offset: polled.offset,
                    });
                }

                events.push(event);
                last_read_offset = Some(polled.offset);
                current_version = version + 1;

                if plan.target_version_exclusive == Some(current_version) {
                    return Ok(EventStream {
                        events,
                        partition,
                        last_read_offset,
                        resulting_version: current_version,
                    });
                }
            }
        }

        debug!(
            %aggregate_id,
            partition,
            polls,
            events = events.len(),
            resulting_version = current_version,
            "replay finished"
        );

        match high_water_mark {
            Some(hwm) if position < hwm => {
                return Err(DomainError::EventReplay(format!(
                    "replay truncated for aggregate {aggregate_id}: stopped at offset {position} of partition {partition}, high-water mark {hwm}"
                )));
            }
            Some(_) => {}
            None if empty_polls < self.config.max_consecutive_empty_polls => {
                warn!(
                    %aggregate_id,
                    partition,
                    position,
                    "replay stopped by poll budget; stream may be truncated"
                );
            }
            None => {}
        }

        Ok(EventStream {
            events,
            partition,
            last_read_offset,
            resulting_version: current_version,
        })
    }
}

#[async_trait]
impl<E: DomainEvent + 'static> EventStore<E> for LogEventStore<E> {
    async fn append(&self, aggregate_id: Uuid, events: &[E]) -> Result<Option<i64>, DomainError> {
        if events.is_empty() {
            return Ok(None);
        }
        if let Some(foreign) = events.iter().find(|e| e.aggregate_id() != aggregate_id) {
            return Err(DomainError::InvalidOperation(format!(
                "event {} belongs to aggregate {}, not {aggregate_id}",
                foreign.base().event_id,
                foreign.aggregate_id()
            )));
        }

        let partition = self.partition_for(aggregate_id);
        let key = aggregate_id.to_string();
        let records = events
            .iter()
            .map(|event| {
                Ok(LogRecord {
                    key: key.clone(),
                    event_type: event.event_type().to_owned(),
                    payload: event.to_payload()?,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let total = records.len();
        let mut last_offset = None;
        for (written, record) in records.into_iter().enumerate() {
            match self.log.append(partition, record).await {
                Ok(offset) => last_offset = Some(offset),
                Err(e) => {
                    if written > 0 {
                        error!(
                            %aggregate_id,
                            partition,
                            written,
                            total,
                            "partial append: log holds a prefix of the batch and needs operator attention"
                        );
                    }
                    return Err(DomainError::EventPersistence(format!(
                        "saving events for aggregate {aggregate_id} failed after {written} of {total}: {e}"
                    )));
                }
            }
        }

        debug!(%aggregate_id, partition, total, ?last_offset, "events appended");
        Ok(last_offset)
    }

    async fn load_full_stream(&self, aggregate_id: Uuid) -> Result<EventStream<E>, DomainError> {
        self.replay(
            aggregate_id,
            ReplayPlan {
                start_offset: 0,
                initial_version: 0,
                target_version_exclusive: None,
            },
        )
        .await
    }

    async fn load_stream_after(
        &self,
        aggregate_id: Uuid,
        offset: i64,
        expected_version: i64,
    ) -> Result<EventStream<E>, DomainError> {
        self.replay(
            aggregate_id,
            ReplayPlan {
                start_offset: offset + 1,
                initial_version: expected_version,
                target_version_exclusive: None,
            },
        )
        .await
    }

    async fn load_stream_up_to_version(
        &self,
        aggregate_id: Uuid,
        target_version_exclusive: i64,
    ) -> Result<EventStream<E>, DomainError> {
        if target_version_exclusive <= 0 {
            return Ok(EventStream::empty(
                self.partition_for(aggregate_id),
                None,
                0,
            ));
        }
        self.replay(
            aggregate_id,
            ReplayPlan {
                start_offset: 0,
                initial_version: 0,
                target_version_exclusive: Some(target_version_exclusive),
            },
        )
        .await
    }
}
