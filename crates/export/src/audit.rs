use std::io::Write;

use stockroom_audit::AuditEntry;

use crate::{DATE_FORMAT, ExportError};

/// Entries in the order given (the log lists newest first).
///
/// System-initiated entries show `system` as the user.
pub fn write_audit_log<'a, W: Write>(
    entries: impl IntoIterator<Item = &'a AuditEntry>,
    out: W,
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["Kind", "Description", "Date", "User"])?;

    for entry in entries {
        let date = entry.recorded_at.format(DATE_FORMAT).to_string();
        let user = entry.actor.as_ref().map_or("system", |a| a.name.as_str());
        writer.write_record([entry.kind.as_str(), entry.description.as_str(), date.as_str(), user])?;
    }

    writer.flush()?;
    Ok(())
}
