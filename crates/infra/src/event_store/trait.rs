use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use stockroom_core::{AggregateId, ExpectedVersion};
use std::sync::Arc;

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// Built from a typed domain event with [`UncommittedEvent::from_typed`], which
/// serializes the payload and captures the metadata needed to decode it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub stream_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A stored event in an append-only stream (assigned a sequence number).
///
/// Sequence numbers start at 1, increase by one per event within a stream and
/// never change once assigned. The last one is the stream version used for
/// optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub stream_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    /// Stream metadata plus the still-encoded payload.
    pub fn into_envelope(self) -> stockroom_events::EventEnvelope<JsonValue> {
        stockroom_events::EventEnvelope::new(
            self.event_id,
            self.stream_id,
            self.aggregate_type,
            self.sequence_number,
            self.payload,
        )
    }
}

/// Event store operation error.
///
/// These are infrastructure failures, as opposed to domain errors.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// The backend could not be reached or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Append-only event store, one stream per ledger.
///
/// `append()` must:
/// - reject batches that mix streams or aggregate types
/// - check `expected_version` against the current stream version
/// - assign sequence numbers starting at `current_version + 1`
/// - persist the whole batch or nothing
///
/// `load_stream()` returns events in sequence order, or an empty vector for an
/// unknown stream.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(stream_id)
    }
}

impl UncommittedEvent {
    /// Wrap a typed domain event for appending.
    pub fn from_typed<E>(
        stream_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: stockroom_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::InvalidAppend(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id,
            stream_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }

    /// Assign the event its place in the stream.
    pub(crate) fn commit(self, sequence_number: u64) -> StoredEvent {
        StoredEvent {
            event_id: self.event_id,
            stream_id: self.stream_id,
            aggregate_type: self.aggregate_type,
            sequence_number,
            event_type: self.event_type,
            event_version: self.event_version,
            occurred_at: self.occurred_at,
            payload: self.payload,
        }
    }
}

/// Number a checked batch from `current + 1`.
pub(crate) fn commit_batch(events: Vec<UncommittedEvent>, current: u64) -> Vec<StoredEvent> {
    events
        .into_iter()
        .zip(current + 1..)
        .map(|(event, sequence_number)| event.commit(sequence_number))
        .collect()
}

/// Decide whether a batch may land on a stream at version `current`.
///
/// `existing_type` is `None` for an empty stream.
pub(crate) fn check_head(
    existing_type: Option<&str>,
    aggregate_type: &str,
    current: u64,
    expected: ExpectedVersion,
) -> Result<(), EventStoreError> {
    if let Some(existing) = existing_type.filter(|t| *t != aggregate_type) {
        return Err(EventStoreError::AggregateTypeMismatch(format!(
            "stream holds '{existing}', append carries '{aggregate_type}'"
        )));
    }
    if !expected.matches(current) {
        return Err(EventStoreError::Concurrency(format!(
            "expected {expected:?}, stream is at {current}"
        )));
    }
    Ok(())
}

/// Check a batch targets a single stream and aggregate type.
///
/// Returns the shared `(stream_id, aggregate_type)`, or `None` for an empty batch.
pub(crate) fn batch_stream(
    events: &[UncommittedEvent],
) -> Result<Option<(AggregateId, String)>, EventStoreError> {
    let Some(first) = events.first() else {
        return Ok(None);
    };

    for (idx, e) in events.iter().enumerate() {
        if e.stream_id != first.stream_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "batch contains multiple streams (index {idx})"
            )));
        }
        if e.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::AggregateTypeMismatch(format!(
                "batch contains multiple aggregate_types (index {idx})"
            )));
        }
    }

    Ok(Some((first.stream_id, first.aggregate_type.clone())))
}
