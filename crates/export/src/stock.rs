use std::io::Write;

use stockroom_inventory::{Dashboard, DeviceView, PartView};

use crate::ExportError;

pub const STOCK_HEADER: [&str; 11] = [
    "Type",
    "Name",
    "Manufacturer",
    "Model",
    "Serial number",
    "Quantity",
    "Warehouse",
    "Loaned",
    "Client",
    "Ticket",
    "Notes",
];

/// Live devices, then parts still in stock.
///
/// Handed-off parts, loans and the archive are not part of the sheet. Pass
/// an unfiltered dashboard for the full inventory or the current one for a
/// view export.
pub fn write_stock<W: Write>(dashboard: &Dashboard, out: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(STOCK_HEADER)?;

    for device in &dashboard.devices {
        writer.write_record(device_row(device))?;
    }
    for part in &dashboard.parts {
        writer.write_record(part_row(part))?;
    }

    writer.flush()?;
    Ok(())
}

fn device_row(d: &DeviceView) -> [String; 11] {
    [
        "Device".to_string(),
        d.name.clone(),
        d.manufacturer.clone(),
        d.model.clone(),
        d.serial_number.clone(),
        d.quantity.to_string(),
        d.warehouse.clone(),
        if d.loaned { "yes" } else { "no" }.to_string(),
        d.client_name.clone().unwrap_or_default(),
        d.ticket_number.clone().unwrap_or_default(),
        d.notes.clone(),
    ]
}

fn part_row(p: &PartView) -> [String; 11] {
    [
        "Part".to_string(),
        p.name.clone(),
        p.manufacturer.clone().unwrap_or_default(),
        p.model.clone().unwrap_or_default(),
        p.serial_number.clone().unwrap_or_default(),
        p.quantity.to_string(),
        p.warehouse.clone(),
        String::new(),
        String::new(),
        String::new(),
        p.notes.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use stockroom_core::{DeviceId, PartId};

    use super::*;

    fn device(serial: &str, loaned: bool) -> DeviceView {
        DeviceView {
            id: DeviceId::new(),
            name: "Laptop".to_string(),
            manufacturer: "Dell".to_string(),
            model: "Latitude".to_string(),
            serial_number: serial.to_string(),
            secondary_index: None,
            quantity: 1,
            warehouse_id: None,
            warehouse: "Main".to_string(),
            loaned,
            client_name: loaned.then(|| "ACME, Inc.".to_string()),
            ticket_number: loaned.then(|| "T-1".to_string()),
            notes: String::new(),
        }
    }

    fn part(quantity: u32, client: Option<&str>) -> PartView {
        PartView {
            id: PartId::new(),
            name: "Charger".to_string(),
            manufacturer: None,
            model: None,
            serial_number: Some("C-1".to_string()),
            quantity,
            warehouse_id: None,
            warehouse: "Main".to_string(),
            client_name: client.map(str::to_string),
            ticket_number: None,
            notes: "boxed".to_string(),
        }
    }

    fn rows(bytes: &[u8]) -> Vec<Vec<String>> {
        csv::Reader::from_reader(bytes)
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn devices_come_before_in_stock_parts() {
        let dashboard = Dashboard {
            devices: vec![device("SN-1", true), device("SN-2", false)],
            parts: vec![part(4, None)],
            handed_off_parts: vec![part(1, Some("ACME"))],
            ..Dashboard::default()
        };
        let mut out = Vec::new();
        write_stock(&dashboard, &mut out).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("Type,Name,Manufacturer,Model,Serial number,Quantity"));

        let rows = rows(&out);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "Device");
        assert_eq!(rows[0][7], "yes");
        // Commas in values are quoted, not split.
        assert_eq!(rows[0][8], "ACME, Inc.");
        assert_eq!(rows[1][7], "no");
        assert_eq!(rows[2], vec!["Part", "Charger", "", "", "C-1", "4", "Main", "", "", "", "boxed"]);
    }

    #[test]
    fn empty_dashboard_writes_only_the_header() {
        let mut out = Vec::new();
        write_stock(&Dashboard::default(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
