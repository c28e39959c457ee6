//! Replay of a single event stream through a projection.
//!
//! Read models are disposable: they can always be rebuilt from the stream.
//! The runner guarantees they see every event of one stream exactly once and
//! in order.

use thiserror::Error;

use stockroom_core::AggregateId;

use crate::{EventEnvelope, Projection};

/// Position of a projection within its stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProjectionCursor {
    stream_id: AggregateId,
    last_sequence_number: u64,
}

impl ProjectionCursor {
    pub fn stream_id(&self) -> AggregateId {
        self.stream_id
    }

    /// 0 until the first event is applied.
    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence_number
    }

    pub fn next_sequence_number(&self) -> u64 {
        self.last_sequence_number + 1
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("envelope from stream {found}, projection follows {expected}")]
    StreamMismatch {
        expected: AggregateId,
        found: AggregateId,
    },

    /// A replayed, skipped or reordered event.
    #[error("expected sequence number {expected}, found {found}")]
    OutOfOrder { expected: u64, found: u64 },
}

#[derive(Debug)]
pub struct ProjectionRunner<P>
where
    P: Projection,
{
    projection: P,
    cursor: Option<ProjectionCursor>,
}

impl<P> ProjectionRunner<P>
where
    P: Projection,
{
    /// Runner that adopts the stream and position of the first envelope it sees.
    pub fn new(projection: P) -> Self {
        Self {
            projection,
            cursor: None,
        }
    }

    /// Runner for `stream_id` that must start at sequence number 1.
    pub fn new_for_stream(stream_id: AggregateId, projection: P) -> Self {
        Self {
            projection,
            cursor: Some(ProjectionCursor {
                stream_id,
                last_sequence_number: 0,
            }),
        }
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn cursor(&self) -> Option<ProjectionCursor> {
        self.cursor
    }

    /// Apply the next envelope of the stream.
    ///
    /// Rejected envelopes leave the projection untouched.
    pub fn apply(&mut self, envelope: &EventEnvelope<P::Ev>) -> Result<(), ProjectionError> {
        let stream_id = envelope.stream_id();
        let found = envelope.sequence_number();

        if let Some(cursor) = self.cursor {
            if cursor.stream_id != stream_id {
                return Err(ProjectionError::StreamMismatch {
                    expected: cursor.stream_id,
                    found: stream_id,
                });
            }
            if found != cursor.next_sequence_number() {
                return Err(ProjectionError::OutOfOrder {
                    expected: cursor.next_sequence_number(),
                    found,
                });
            }
        }

        self.projection.apply(envelope);
        self.cursor = Some(ProjectionCursor {
            stream_id,
            last_sequence_number: found,
        });
        Ok(())
    }

    pub fn run<'a>(
        &mut self,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
    ) -> Result<(), ProjectionError>
    where
        P::Ev: 'a,
    {
        envelopes.into_iter().try_for_each(|env| self.apply(env))
    }
}
