use std::collections::HashMap;
use std::sync::RwLock;

use stockroom_core::{AggregateId, ExpectedVersion};

use super::r#trait::{
    EventStore, EventStoreError, StoredEvent, UncommittedEvent, batch_stream, check_head,
    commit_batch,
};

/// Event store backed by a map of streams. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<AggregateId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> EventStoreError {
    EventStoreError::Unavailable("stream map lock poisoned".to_string())
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some((stream_id, aggregate_type)) = batch_stream(&events)? else {
            return Ok(Vec::new());
        };

        let mut streams = self.streams.write().map_err(poisoned)?;
        let stream = streams.entry(stream_id).or_default();
        let current = stream.last().map_or(0, |e| e.sequence_number);
        check_head(
            stream.first().map(|e| e.aggregate_type.as_str()),
            &aggregate_type,
            current,
            expected,
        )?;

        let committed = commit_batch(events, current);
        stream.extend_from_slice(&committed);
        Ok(committed)
    }

    fn load_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(poisoned)?;
        Ok(streams.get(&stream_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn event(stream_id: AggregateId, aggregate_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            stream_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "test.event".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({}),
        }
    }

    #[test]
    fn assigns_consecutive_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let stream = AggregateId::new();

        let first = store
            .append(vec![event(stream, "t"), event(stream, "t")], ExpectedVersion::Exact(0))
            .unwrap();
        let second = store
            .append(vec![event(stream, "t")], ExpectedVersion::Exact(2))
            .unwrap();

        assert_eq!(first[1].sequence_number, 2);
        assert_eq!(second[0].sequence_number, 3);
        assert_eq!(store.load_stream(stream).unwrap().len(), 3);
    }

    #[test]
    fn stale_expected_version_is_a_concurrency_error() {
        let store = InMemoryEventStore::new();
        let stream = AggregateId::new();
        store
            .append(vec![event(stream, "t")], ExpectedVersion::Exact(0))
            .unwrap();

        let err = store
            .append(vec![event(stream, "t")], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(stream).unwrap().len(), 1);
    }

    #[test]
    fn rejects_mixed_batches_without_writing() {
        let store = InMemoryEventStore::new();
        let stream = AggregateId::new();

        let err = store
            .append(
                vec![event(stream, "t"), event(AggregateId::new(), "t")],
                ExpectedVersion::Any,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
        assert!(store.load_stream(stream).unwrap().is_empty());
    }

    #[test]
    fn aggregate_type_is_stable_per_stream() {
        let store = InMemoryEventStore::new();
        let stream = AggregateId::new();
        store.append(vec![event(stream, "a")], ExpectedVersion::Any).unwrap();

        let err = store
            .append(vec![event(stream, "b")], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }
}
