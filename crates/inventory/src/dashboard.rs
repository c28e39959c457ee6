//! Dashboard read path: filtered, sorted views of the ledger.

use core::cmp::Ordering;
use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DeviceId, DomainError, LoanId, PartId, WarehouseId};

use crate::{ArchivedDevice, Device, Ledger, Part};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    Manufacturer,
    Model,
    Serial,
    Quantity,
    Warehouse,
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortField::Name),
            "manufacturer" => Ok(SortField::Manufacturer),
            "model" => Ok(SortField::Model),
            "serial" | "serial_number" => Ok(SortField::Serial),
            "quantity" => Ok(SortField::Quantity),
            "warehouse" => Ok(SortField::Warehouse),
            other => Err(DomainError::validation(format!("unknown sort field '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(DomainError::validation(format!("unknown sort direction '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardFilter {
    pub warehouse: Option<WarehouseId>,
    pub search: Option<String>,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl DashboardFilter {
    pub fn in_warehouse(mut self, warehouse: WarehouseId) -> Self {
        self.warehouse = Some(warehouse);
        self
    }

    pub fn searching(mut self, phrase: impl Into<String>) -> Self {
        self.search = Some(phrase.into());
        self
    }

    pub fn sorted_by(mut self, sort: SortField, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    fn phrase(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_lowercase)
    }

    fn admits(&self, warehouse: Option<WarehouseId>) -> bool {
        self.warehouse.is_none() || self.warehouse == warehouse
    }
}

fn contains(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

/// A live device with catalog names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceView {
    pub id: DeviceId,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub secondary_index: Option<String>,
    pub quantity: u32,
    pub warehouse_id: Option<WarehouseId>,
    pub warehouse: String,
    pub loaned: bool,
    /// The device's own client, or the active loan's.
    pub client_name: Option<String>,
    pub ticket_number: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartView {
    pub id: PartId,
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: u32,
    pub warehouse_id: Option<WarehouseId>,
    pub warehouse: String,
    pub client_name: Option<String>,
    pub ticket_number: Option<String>,
    pub notes: String,
}

/// An active loan. Device fields are `None` when the device no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub device_id: DeviceId,
    pub device_name: Option<String>,
    pub device_serial: Option<String>,
    pub client_name: String,
    pub ticket_number: String,
    pub loaned_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveView {
    pub id: DeviceId,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub quantity: u32,
    pub warehouse: String,
    pub client_name: Option<String>,
    pub ticket_number: Option<String>,
    pub notes: String,
    pub archived_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub devices: Vec<DeviceView>,
    /// Parts still in stock.
    pub parts: Vec<PartView>,
    pub handed_off_parts: Vec<PartView>,
    pub loans: Vec<LoanView>,
    pub archive: Vec<ArchiveView>,
}

/// Sort key shared by device and archive rows.
trait Sortable {
    fn text(&self, field: SortField) -> &str;
    fn quantity(&self) -> u32;
}

macro_rules! sortable_rows {
    ($($row:ty),+) => {$(
        impl Sortable for $row {
            fn text(&self, field: SortField) -> &str {
                match field {
                    SortField::Name => &self.name,
                    SortField::Manufacturer => &self.manufacturer,
                    SortField::Model => &self.model,
                    SortField::Serial => &self.serial_number,
                    SortField::Warehouse => &self.warehouse,
                    SortField::Quantity => "",
                }
            }

            fn quantity(&self) -> u32 {
                self.quantity
            }
        }
    )+};
}

sortable_rows!(DeviceView, ArchiveView);

fn sort_rows<T: Sortable>(rows: &mut [T], field: SortField, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ordering = match field {
            SortField::Quantity => a.quantity().cmp(&b.quantity()),
            _ => a
                .text(field)
                .to_lowercase()
                .cmp(&b.text(field).to_lowercase()),
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

impl Ledger {
    pub fn device_view(&self, device: &Device) -> DeviceView {
        let catalog = self.catalog();
        let loan = self.loan_for(device.id);
        DeviceView {
            id: device.id,
            name: catalog.device_name_label(device.name).to_string(),
            manufacturer: catalog.manufacturer_name(Some(device.manufacturer)).to_string(),
            model: catalog.model_name(Some(device.model)).to_string(),
            serial_number: device.serial_number.clone(),
            secondary_index: device.secondary_index.clone(),
            quantity: device.quantity,
            warehouse_id: device.warehouse,
            warehouse: catalog.warehouse_name(device.warehouse).to_string(),
            loaned: loan.is_some(),
            client_name: device
                .client_name
                .clone()
                .or_else(|| loan.map(|l| l.client_name.clone())),
            ticket_number: device
                .ticket_number
                .clone()
                .or_else(|| loan.map(|l| l.ticket_number.clone())),
            notes: device.notes.clone(),
        }
    }

    pub fn part_view(&self, part: &Part) -> PartView {
        let catalog = self.catalog();
        PartView {
            id: part.id,
            name: catalog.device_name_label(part.name).to_string(),
            manufacturer: part.manufacturer.clone(),
            model: part.model.clone(),
            serial_number: part.serial_number.clone(),
            quantity: part.quantity,
            warehouse_id: part.warehouse,
            warehouse: catalog.warehouse_name(part.warehouse).to_string(),
            client_name: part.client_name.clone(),
            ticket_number: part.ticket_number.clone(),
            notes: part.notes.clone(),
        }
    }

    pub fn archive_view(&self, archived: &ArchivedDevice) -> ArchiveView {
        let catalog = self.catalog();
        ArchiveView {
            id: archived.id,
            name: catalog.device_name_label(archived.name).to_string(),
            manufacturer: catalog.manufacturer_name(archived.manufacturer).to_string(),
            model: catalog.model_name(archived.model).to_string(),
            serial_number: archived.serial_number.clone(),
            quantity: archived.quantity,
            warehouse: catalog.warehouse_name(archived.warehouse).to_string(),
            client_name: archived.client_name.clone(),
            ticket_number: archived.ticket_number.clone(),
            notes: archived.notes.clone(),
            archived_at: archived.archived_at,
        }
    }

    /// Assemble the dashboard for a filter.
    ///
    /// Devices and archive follow the filter's sort; parts and loans are
    /// listed newest first.
    pub fn dashboard(&self, filter: &DashboardFilter) -> Dashboard {
        let phrase = filter.phrase();
        let matches_any = |fields: &[&str]| match &phrase {
            None => true,
            Some(p) => fields.iter().any(|f| contains(f, p)),
        };

        let mut devices: Vec<DeviceView> = self
            .devices()
            .filter(|d| filter.admits(d.warehouse))
            .map(|d| self.device_view(d))
            .filter(|v| {
                matches_any(&[
                    v.name.as_str(),
                    v.serial_number.as_str(),
                    v.model.as_str(),
                    v.manufacturer.as_str(),
                ])
            })
            .collect();
        sort_rows(&mut devices, filter.sort, filter.direction);

        let mut archive: Vec<ArchiveView> = self
            .archive()
            .filter(|a| filter.admits(a.warehouse))
            .map(|a| self.archive_view(a))
            .filter(|v| {
                matches_any(&[
                    v.name.as_str(),
                    v.serial_number.as_str(),
                    v.model.as_str(),
                    v.manufacturer.as_str(),
                ])
            })
            .collect();
        sort_rows(&mut archive, filter.sort, filter.direction);

        let mut parts: Vec<&Part> = self
            .parts()
            .filter(|p| filter.admits(p.warehouse))
            .collect();
        parts.sort_by(|a, b| b.created_seq.cmp(&a.created_seq));
        let (handed_off, in_stock): (Vec<&Part>, Vec<&Part>) =
            parts.into_iter().partition(|p| p.is_handed_off());
        let part_views = |rows: Vec<&Part>| -> Vec<PartView> {
            rows.into_iter()
                .map(|p| self.part_view(p))
                .filter(|v| matches_any(&[v.name.as_str()]))
                .collect()
        };

        let mut loans: Vec<LoanView> = self
            .loans()
            .filter_map(|loan| {
                let device = self.device(loan.device_id);
                if !filter.admits(device.and_then(|d| d.warehouse)) {
                    return None;
                }
                let view = LoanView {
                    id: loan.id,
                    device_id: loan.device_id,
                    device_name: device
                        .map(|d| self.catalog().device_name_label(d.name).to_string()),
                    device_serial: device.map(|d| d.serial_number.clone()),
                    client_name: loan.client_name.clone(),
                    ticket_number: loan.ticket_number.clone(),
                    loaned_on: loan.loaned_on,
                };
                let fields = [
                    view.device_name.as_deref().unwrap_or_default(),
                    view.device_serial.as_deref().unwrap_or_default(),
                    view.client_name.as_str(),
                    view.ticket_number.as_str(),
                ];
                matches_any(&fields).then_some(view)
            })
            .collect();
        loans.sort_by(|a, b| match b.loaned_on.cmp(&a.loaned_on) {
            Ordering::Equal => b.id.cmp(&a.id),
            other => other,
        });

        Dashboard {
            devices,
            parts: part_views(in_stock),
            handed_off_parts: part_views(handed_off),
            loans,
            archive,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use stockroom_core::{
        Actor, AggregateId, DeviceModelId, DeviceNameId, ManufacturerId, UserId,
    };
    use stockroom_events::execute;

    use super::*;
    use crate::{DeviceDetails, LedgerAction, LedgerCommand, PartDetails};

    struct Seed {
        ledger: Ledger,
        main: WarehouseId,
        annex: WarehouseId,
    }

    fn run(ledger: &mut Ledger, action: LedgerAction) {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let actor = Some(Actor::new(UserId::new(), "anna"));
        execute(ledger, &LedgerCommand::new(actor, at, action)).unwrap();
    }

    fn seeded() -> Seed {
        let mut ledger = Ledger::empty(AggregateId::new());
        let main = WarehouseId::new();
        let annex = WarehouseId::new();
        let acme = ManufacturerId::new();
        let zenith = ManufacturerId::new();
        let x1 = DeviceModelId::new();
        let z9 = DeviceModelId::new();
        let laptop = DeviceNameId::new();
        let router = DeviceNameId::new();
        run(&mut ledger, LedgerAction::RegisterWarehouse { warehouse_id: main, name: "Main".into() });
        run(&mut ledger, LedgerAction::RegisterWarehouse { warehouse_id: annex, name: "Annex".into() });
        run(&mut ledger, LedgerAction::RegisterManufacturer { manufacturer_id: acme, name: "Acme".into() });
        run(&mut ledger, LedgerAction::RegisterManufacturer { manufacturer_id: zenith, name: "Zenith".into() });
        run(
            &mut ledger,
            LedgerAction::RegisterDeviceModel { model_id: x1, manufacturer_id: acme, name: "X1".into() },
        );
        run(
            &mut ledger,
            LedgerAction::RegisterDeviceModel { model_id: z9, manufacturer_id: zenith, name: "Z9".into() },
        );
        run(&mut ledger, LedgerAction::RegisterDeviceName { name_id: laptop, name: "Laptop".into() });
        run(&mut ledger, LedgerAction::RegisterDeviceName { name_id: router, name: "router".into() });

        let mut intake = |name, manufacturer, model, serial: &str, quantity, warehouse| {
            let mut details = DeviceDetails::new(manufacturer, model, serial)
                .named(name)
                .in_warehouse(warehouse);
            details.quantity = quantity;
            let device_id = DeviceId::new();
            run(&mut ledger, LedgerAction::IntakeDevice { device_id, details });
            device_id
        };
        intake(laptop, acme, x1, "SN-B", 3, main);
        let routed = intake(router, zenith, z9, "SN-A", 1, annex);
        intake(laptop, zenith, z9, "SN-C", 2, main);

        run(
            &mut ledger,
            LedgerAction::CheckoutDevice {
                loan_id: LoanId::new(),
                device_id: routed,
                client_name: "Globex".into(),
                ticket_number: "T-77".into(),
            },
        );

        for (serial, warehouse) in [("P-1", main), ("P-2", annex)] {
            run(
                &mut ledger,
                LedgerAction::IntakePart {
                    part_id: PartId::new(),
                    details: PartDetails {
                        name: Some(laptop),
                        serial_number: Some(serial.into()),
                        quantity: 5,
                        warehouse: Some(warehouse),
                        ..PartDetails::default()
                    },
                },
            );
        }
        Seed { ledger, main, annex }
    }

    fn serials(devices: &[DeviceView]) -> Vec<&str> {
        devices.iter().map(|d| d.serial_number.as_str()).collect()
    }

    #[test]
    fn default_filter_sorts_devices_by_name_ascending() {
        let seed = seeded();
        let dashboard = seed.ledger.dashboard(&DashboardFilter::default());

        // Case-insensitive: "Laptop" sorts before "router".
        let names: Vec<&str> = dashboard.devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Laptop", "Laptop", "router"]);
        assert_eq!(dashboard.devices[2].serial_number, "SN-A");
        assert_eq!(dashboard.parts.len(), 2);
        assert!(dashboard.handed_off_parts.is_empty());
        assert_eq!(dashboard.loans.len(), 1);
    }

    #[test]
    fn sorts_by_quantity_descending() {
        let seed = seeded();
        let filter =
            DashboardFilter::default().sorted_by(SortField::Quantity, SortDirection::Desc);
        let dashboard = seed.ledger.dashboard(&filter);
        assert_eq!(serials(&dashboard.devices), vec!["SN-B", "SN-C", "SN-A"]);

        let filter = DashboardFilter::default().sorted_by(SortField::Serial, SortDirection::Desc);
        let dashboard = seed.ledger.dashboard(&filter);
        assert_eq!(serials(&dashboard.devices), vec!["SN-C", "SN-B", "SN-A"]);
    }

    #[test]
    fn archive_follows_the_device_sort() {
        let mut seed = seeded();
        let handed: Vec<DeviceId> = seed
            .ledger
            .devices()
            .filter(|d| d.serial_number != "SN-A")
            .map(|d| d.id)
            .collect();
        for device_id in handed {
            run(
                &mut seed.ledger,
                LedgerAction::HandOffDevice {
                    device_id,
                    client_name: Some("Initech".into()),
                    ticket_number: None,
                    notes: String::new(),
                },
            );
        }

        let archived = |filter: &DashboardFilter| -> Vec<String> {
            seed.ledger
                .dashboard(filter)
                .archive
                .into_iter()
                .map(|a| a.serial_number)
                .collect()
        };
        let by_serial = DashboardFilter::default().sorted_by(SortField::Serial, SortDirection::Desc);
        assert_eq!(archived(&by_serial), vec!["SN-C", "SN-B"]);
        let by_quantity =
            DashboardFilter::default().sorted_by(SortField::Quantity, SortDirection::Asc);
        assert_eq!(archived(&by_quantity), vec!["SN-C", "SN-B"]);
        let by_manufacturer =
            DashboardFilter::default().sorted_by(SortField::Manufacturer, SortDirection::Asc);
        assert_eq!(archived(&by_manufacturer), vec!["SN-B", "SN-C"]);
    }

    #[test]
    fn warehouse_filter_applies_to_every_list() {
        let seed = seeded();
        let dashboard = seed.ledger.dashboard(&DashboardFilter::default().in_warehouse(seed.annex));

        assert_eq!(serials(&dashboard.devices), vec!["SN-A"]);
        assert_eq!(dashboard.parts.len(), 1);
        assert_eq!(dashboard.parts[0].serial_number.as_deref(), Some("P-2"));
        assert_eq!(dashboard.loans.len(), 1);

        let dashboard = seed.ledger.dashboard(&DashboardFilter::default().in_warehouse(seed.main));
        assert!(dashboard.loans.is_empty());
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let seed = seeded();

        let by_manufacturer = seed.ledger.dashboard(&DashboardFilter::default().searching("zEnItH"));
        assert_eq!(serials(&by_manufacturer.devices), vec!["SN-C", "SN-A"]);
        // Parts match on name only.
        assert!(by_manufacturer.parts.is_empty());

        let by_client = seed.ledger.dashboard(&DashboardFilter::default().searching("globex"));
        assert!(by_client.devices.is_empty());
        assert_eq!(by_client.loans.len(), 1);
        assert_eq!(by_client.loans[0].device_serial.as_deref(), Some("SN-A"));

        let blank = seed.ledger.dashboard(&DashboardFilter::default().searching("   "));
        assert_eq!(blank.devices.len(), 3);
    }

    #[test]
    fn loaned_devices_show_the_loan_client() {
        let seed = seeded();
        let dashboard = seed.ledger.dashboard(&DashboardFilter::default());
        let routed = dashboard.devices.iter().find(|d| d.serial_number == "SN-A").unwrap();
        assert!(routed.loaned);
        assert_eq!(routed.client_name.as_deref(), Some("Globex"));
        assert_eq!(routed.ticket_number.as_deref(), Some("T-77"));
        assert_eq!(routed.warehouse, "Annex");
    }

    #[test]
    fn handed_off_parts_are_listed_apart_newest_first() {
        let mut seed = seeded();
        let source = seed
            .ledger
            .dashboard(&DashboardFilter::default().in_warehouse(seed.main))
            .parts[0]
            .id;
        for client in ["First", "Second"] {
            run(
                &mut seed.ledger,
                LedgerAction::HandOffPart {
                    part_id: source,
                    fragment_id: PartId::new(),
                    amount: 1,
                    client_name: client.into(),
                    ticket_number: None,
                    notes: String::new(),
                },
            );
        }

        let dashboard = seed.ledger.dashboard(&DashboardFilter::default());
        let clients: Vec<&str> = dashboard
            .handed_off_parts
            .iter()
            .filter_map(|p| p.client_name.as_deref())
            .collect();
        assert_eq!(clients, vec!["Second", "First"]);
        assert_eq!(dashboard.parts.len(), 2);
    }

    #[test]
    fn sort_and_direction_parse_from_query_strings() {
        assert_eq!("Quantity".parse::<SortField>().unwrap(), SortField::Quantity);
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("colour".parse::<SortField>().is_err());
    }
}
