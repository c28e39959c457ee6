use crate::{Event, EventEnvelope};

/// A projection builds a read model from an append-only event stream.
///
/// Read models are **disposable**: they can be dropped and rebuilt by replaying
/// the stream at any time. Projections that need the event metadata (event id,
/// position) get the whole envelope rather than the bare payload.
pub trait Projection {
    type Ev: Event;

    /// Apply a single event to the projection, updating the read model.
    ///
    /// Events that are irrelevant to the projection are ignored. Sequencing is
    /// checked by `ProjectionRunner`, not here.
    fn apply(&mut self, envelope: &EventEnvelope<Self::Ev>);
}
