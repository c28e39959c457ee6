use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockroom_core::AggregateId;

/// An event together with its place in a stream.
///
/// The payload is a typed domain event in memory and raw JSON at the storage
/// boundary; [`EventEnvelope::try_map`] converts between the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    stream_id: AggregateId,
    aggregate_type: String,

    /// 1-based, no gaps.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        stream_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            stream_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn stream_id(&self) -> AggregateId {
        self.stream_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    /// Decode or re-encode the payload, keeping the metadata.
    pub fn try_map<F, T, Err>(self, f: F) -> Result<EventEnvelope<T>, Err>
    where
        F: FnOnce(E) -> Result<T, Err>,
    {
        Ok(EventEnvelope {
            event_id: self.event_id,
            stream_id: self.stream_id,
            aggregate_type: self.aggregate_type,
            sequence_number: self.sequence_number,
            payload: f(self.payload)?,
        })
    }
}
