use stockroom_audit::{AuditEntry, AuditLog};
use stockroom_core::AuditEntryId;
use stockroom_events::{EventEnvelope, Projection};

use crate::LedgerEvent;

/// Audit log projected from committed ledger events.
///
/// Each audited event becomes one entry whose id is the event id.
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    log: AuditLog,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &AuditLog {
        &self.log
    }
}

impl Projection for AuditTrail {
    type Ev = LedgerEvent;

    fn apply(&mut self, envelope: &EventEnvelope<LedgerEvent>) {
        let event = envelope.payload();
        if let Some(record) = &event.audit {
            self.log.append(AuditEntry::from_record(
                AuditEntryId::from_uuid(envelope.event_id()),
                record.clone(),
                event.occurred_at,
                event.actor.clone(),
            ));
        }
    }
}
