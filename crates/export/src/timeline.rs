use std::io::Write;

use stockroom_inventory::TimelineEvent;

use crate::{DATE_FORMAT, ExportError};

/// One device's history, in the order given (newest first from the service).
pub fn write_timeline<W: Write>(events: &[TimelineEvent], out: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["Date", "Category", "Description"])?;

    for event in events {
        writer.write_record([
            event.at.format(DATE_FORMAT).to_string(),
            event.category.to_string(),
            event.description.clone(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
