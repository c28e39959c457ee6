use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::DomainError;

/// Operation type of an audit entry.
///
/// The string forms are stable: exports and stored entries depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    Create,
    Update,
    Delete,
    Restock,
    Transfer,
    HandoffPart,
    HandoffDevice,
    Loan,
    Return,
    Restore,
}

impl AuditKind {
    pub const ALL: [AuditKind; 10] = [
        AuditKind::Create,
        AuditKind::Update,
        AuditKind::Delete,
        AuditKind::Restock,
        AuditKind::Transfer,
        AuditKind::HandoffPart,
        AuditKind::HandoffDevice,
        AuditKind::Loan,
        AuditKind::Return,
        AuditKind::Restore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AuditKind::Create => "CREATE",
            AuditKind::Update => "UPDATE",
            AuditKind::Delete => "DELETE",
            AuditKind::Restock => "RESTOCK",
            AuditKind::Transfer => "TRANSFER",
            AuditKind::HandoffPart => "HANDOFF_PART",
            AuditKind::HandoffDevice => "HANDOFF_DEVICE",
            AuditKind::Loan => "LOAN",
            AuditKind::Return => "RETURN",
            AuditKind::Restore => "RESTORE",
        }
    }
}

impl core::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown audit kind '{s}'")))
    }
}
