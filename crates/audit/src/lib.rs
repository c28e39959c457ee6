//! Audit trail vocabulary: what kind of mutation happened, a human-readable
//! description, who did it and which record it concerns.
//!
//! The log is append-only. Entries are produced from committed ledger events,
//! never written on their own.

pub mod entry;
pub mod kind;
pub mod log;

pub use entry::{AuditEntry, AuditRecord, AuditSubject};
pub use kind::AuditKind;
pub use log::{AuditLog, LegacyHistory};
