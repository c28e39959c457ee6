//! Command execution pipeline for the ledger.
//!
//! ```text
//! LedgerCommand
//!   ↓
//! 1. Decide events against the in-process replica (pure, no mutation)
//!   ↓
//! 2. Append all events of the command in one batch, expecting the replica's version
//!   ↓
//! 3. Apply the committed events to the replica: ledger state + audit trail
//! ```
//!
//! Nothing is applied before the append succeeds, so a failed append leaves
//! both the ledger and the audit log untouched. A version conflict means
//! another writer got there first: the replica is reloaded from the store and
//! the command is rejected so the caller can resubmit.

use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use stockroom_auth::AuthzError;
use stockroom_audit::AuditLog;
use stockroom_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion};
use stockroom_events::{EventEnvelope, ProjectionError, ProjectionRunner};
use stockroom_inventory::{
    AGGREGATE_TYPE, AuditTrail, Ledger, LedgerCommand, LedgerEvent, SameWarehouseMove,
};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The command was rejected by ledger rules.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// Another writer appended first; the replica has been reloaded.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    /// A stored payload could not be decoded into a ledger event.
    #[error("failed to decode stored event: {0}")]
    Deserialize(String),

    /// The stored stream is inconsistent (foreign stream, gaps, reordering).
    #[error("replay failed: {0}")]
    Replay(#[from] ProjectionError),

    /// The store failed; nothing was committed.
    #[error("persistence failed: {0}")]
    Persistence(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Persistence(other),
        }
    }
}

/// Ledger state and audit trail rebuilt from one stream.
#[derive(Debug)]
struct Replica {
    ledger: Ledger,
    audit: ProjectionRunner<AuditTrail>,
}

impl Replica {
    fn empty(stream_id: AggregateId, same_warehouse_moves: SameWarehouseMove) -> Self {
        Self {
            ledger: Ledger::empty(stream_id).with_same_warehouse_moves(same_warehouse_moves),
            audit: ProjectionRunner::new_for_stream(stream_id, AuditTrail::new()),
        }
    }

    fn apply(&mut self, envelope: &EventEnvelope<LedgerEvent>) -> Result<(), DispatchError> {
        self.audit.apply(envelope)?;
        self.ledger.apply(envelope.payload());
        Ok(())
    }
}

/// Serialises commands against one ledger stream.
///
/// Reads go through [`CommandDispatcher::read`], which sees the replica as of
/// the last committed command.
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
    stream_id: AggregateId,
    same_warehouse_moves: SameWarehouseMove,
    replica: Mutex<Replica>,
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Open the ledger stored under `stream_id`, replaying its history.
    pub fn open(
        store: S,
        stream_id: AggregateId,
        same_warehouse_moves: SameWarehouseMove,
    ) -> Result<Self, DispatchError> {
        let replica = load_replica(&store, stream_id, same_warehouse_moves)?;
        Ok(Self {
            store,
            stream_id,
            same_warehouse_moves,
            replica: Mutex::new(replica),
        })
    }

    pub fn stream_id(&self) -> AggregateId {
        self.stream_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decide, append, then apply a command.
    ///
    /// Returns the committed events (empty when the command changes nothing).
    #[instrument(
        skip(self, command),
        fields(stream_id = %self.stream_id, actor = ?command.actor.as_ref().map(|a| a.id)),
        err
    )]
    pub fn dispatch(&self, command: LedgerCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        let mut replica = self.lock()?;

        let decided = replica.ledger.handle(&command).inspect_err(|e| {
            warn!(error = %e, "command rejected");
        })?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let expected = ExpectedVersion::Exact(replica.ledger.version());
        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(self.stream_id, AGGREGATE_TYPE, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = match self.store.append(uncommitted, expected) {
            Ok(committed) => committed,
            Err(EventStoreError::Concurrency(msg)) => {
                warn!(%msg, "stale replica, reloading");
                *replica = load_replica(&self.store, self.stream_id, self.same_warehouse_moves)?;
                return Err(DispatchError::Concurrency(msg));
            }
            Err(e) => {
                warn!(error = %e, "append failed, nothing committed");
                return Err(DispatchError::Persistence(e));
            }
        };

        for (stored, event) in committed.iter().zip(decided) {
            let envelope = EventEnvelope::new(
                stored.event_id,
                stored.stream_id,
                stored.aggregate_type.clone(),
                stored.sequence_number,
                event,
            );
            if let Err(e) = replica.apply(&envelope) {
                *replica = load_replica(&self.store, self.stream_id, self.same_warehouse_moves)?;
                return Err(e);
            }
        }

        info!(
            events = committed.len(),
            version = replica.ledger.version(),
            "command committed"
        );
        Ok(committed)
    }

    /// Run `f` against the current ledger and audit log.
    pub fn read<T>(&self, f: impl FnOnce(&Ledger, &AuditLog) -> T) -> Result<T, DispatchError> {
        let replica = self.lock()?;
        Ok(f(&replica.ledger, replica.audit.projection().log()))
    }

    /// Rebuild the replica from the store, picking up other writers' commits.
    #[instrument(skip(self), fields(stream_id = %self.stream_id), err)]
    pub fn refresh(&self) -> Result<u64, DispatchError> {
        let fresh = load_replica(&self.store, self.stream_id, self.same_warehouse_moves)?;
        let version = fresh.ledger.version();
        *self.lock()? = fresh;
        debug!(version, "replica refreshed");
        Ok(version)
    }

    pub fn version(&self) -> Result<u64, DispatchError> {
        Ok(self.lock()?.ledger.version())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Replica>, DispatchError> {
        self.replica.lock().map_err(|_| {
            DispatchError::Persistence(EventStoreError::Unavailable(
                "replica lock poisoned".to_string(),
            ))
        })
    }
}

fn load_replica<S: EventStore>(
    store: &S,
    stream_id: AggregateId,
    same_warehouse_moves: SameWarehouseMove,
) -> Result<Replica, DispatchError> {
    let history = store.load_stream(stream_id)?;
    let mut replica = Replica::empty(stream_id, same_warehouse_moves);

    for stored in history {
        let raw = stored.into_envelope();
        if raw.aggregate_type() != AGGREGATE_TYPE {
            return Err(DispatchError::Deserialize(format!(
                "unexpected aggregate type '{}' at sequence {}",
                raw.aggregate_type(),
                raw.sequence_number()
            )));
        }
        let envelope = raw
            .try_map(serde_json::from_value::<LedgerEvent>)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        replica.apply(&envelope)?;
    }

    debug!(version = replica.ledger.version(), "replica loaded");
    Ok(replica)
}
