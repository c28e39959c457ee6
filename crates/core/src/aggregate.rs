//! Event-sourced aggregate contract.

/// Identity and position of an aggregate.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far, which is also the sequence number of
    /// the last stored event of the stream.
    fn version(&self) -> u64;
}

/// Stream version a writer expects to append after.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// No check. Only used for bulk imports and tests.
    Any,
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == actual,
        }
    }
}

/// Decide-then-evolve state machine.
///
/// `handle` validates a command against the current state and returns the
/// events it produces, without touching state. `apply` folds one event into
/// the state and must accept any event `handle` ever produced, including
/// events read back from storage.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
