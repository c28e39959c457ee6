use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Actor, AuditEntryId, DeviceId, PartId};

use crate::AuditKind;

/// The record an audit entry is about.
///
/// Entries written by the ledger always name their subject. Entries imported
/// from older systems carry only free text and are `Unreferenced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AuditSubject {
    Device(DeviceId),
    Part(PartId),
    Unreferenced,
}

/// What a mutation contributes to the audit trail, decided together with the
/// mutation itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub kind: AuditKind,
    pub description: String,
    pub subject: AuditSubject,
}

impl AuditRecord {
    pub fn new(kind: AuditKind, subject: AuditSubject, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            subject,
        }
    }
}

/// One immutable line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub kind: AuditKind,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
    /// `None` for system-initiated mutations.
    pub actor: Option<Actor>,
    pub subject: AuditSubject,
}

impl AuditEntry {
    pub fn from_record(
        id: AuditEntryId,
        record: AuditRecord,
        recorded_at: DateTime<Utc>,
        actor: Option<Actor>,
    ) -> Self {
        Self {
            id,
            kind: record.kind,
            description: record.description,
            recorded_at,
            actor,
            subject: record.subject,
        }
    }

    /// Case-insensitive substring match against the description.
    pub fn mentions(&self, phrase: &str) -> bool {
        let phrase = phrase.trim();
        !phrase.is_empty()
            && self
                .description
                .to_lowercase()
                .contains(&phrase.to_lowercase())
    }
}
