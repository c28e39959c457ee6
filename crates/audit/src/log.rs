use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::{DeviceId, DomainError};

use crate::{AuditEntry, AuditSubject};

/// How device timelines treat entries that carry no structured subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegacyHistory {
    /// Join unreferenced entries by a case-insensitive serial-number substring.
    #[default]
    MatchSerial,
    /// Leave unreferenced entries out of device timelines.
    Exclude,
}

impl FromStr for LegacyHistory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "match-serial" => Ok(LegacyHistory::MatchSerial),
            "exclude" => Ok(LegacyHistory::Exclude),
            other => Err(DomainError::validation(format!(
                "legacy history policy must be 'match-serial' or 'exclude', got '{other}'"
            ))),
        }
    }
}

/// Append-only audit log.
///
/// There is no way to edit or remove an entry once appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, newest first. Entries recorded at the same instant keep
    /// reverse append order.
    pub fn list(&self) -> Vec<&AuditEntry> {
        let mut entries: Vec<&AuditEntry> = self.entries.iter().rev().collect();
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        entries
    }

    /// Entries whose description contains `phrase` (case-insensitive), newest first.
    pub fn search(&self, phrase: &str) -> Vec<&AuditEntry> {
        self.list()
            .into_iter()
            .filter(|entry| entry.mentions(phrase))
            .collect()
    }

    /// Entries that belong to a device's history, newest first.
    ///
    /// `device_ids` lists every id the device has carried.
    pub fn for_device(
        &self,
        device_ids: &[DeviceId],
        serial_number: &str,
        legacy: LegacyHistory,
    ) -> Vec<&AuditEntry> {
        self.list()
            .into_iter()
            .filter(|entry| match entry.subject {
                AuditSubject::Device(id) => device_ids.contains(&id),
                AuditSubject::Part(_) => false,
                AuditSubject::Unreferenced => {
                    legacy == LegacyHistory::MatchSerial && entry.mentions(serial_number)
                }
            })
            .collect()
    }
}
