//! The inventory ledger aggregate.
//!
//! One event stream holds the whole ledger: catalog, devices (live and
//! archived), parts, loans and transfers. Commands are decided against the
//! current state without mutating it; every resulting event carries the audit
//! record of the change it describes.

use std::collections::{BTreeMap, HashMap};

use stockroom_audit::{AuditKind, AuditRecord, AuditSubject};
use stockroom_core::{
    Aggregate, AggregateId, AggregateRoot, DeviceId, DeviceModelId, DeviceNameId, DomainError,
    DomainResult, LoanId, ManufacturerId, PartId, TransferId, WarehouseId,
};

use crate::catalog::{
    Catalog, DeviceModel, DeviceName, Manufacturer, Warehouse, optional_label, required_label,
};
use crate::{
    ArchivedDevice, Device, DeviceDetails, DeviceRecord, LedgerAction, LedgerChange,
    LedgerCommand, LedgerEvent, Loan, Part, PartDetails, SameWarehouseMove, Transfer,
};

/// Aggregate type name used on the event stream.
pub const AGGREGATE_TYPE: &str = "stockroom.ledger";

/// Aggregate root: the inventory ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    id: AggregateId,
    version: u64,
    same_warehouse_moves: SameWarehouseMove,
    catalog: Catalog,
    devices: BTreeMap<DeviceId, DeviceRecord>,
    parts: BTreeMap<PartId, Part>,
    loans: BTreeMap<LoanId, Loan>,
    transfers: Vec<Transfer>,
    /// Restored device id -> the archived id it replaced.
    restored_from: HashMap<DeviceId, DeviceId>,
}

impl Ledger {
    /// Create an empty ledger for rehydration.
    pub fn empty(id: AggregateId) -> Self {
        Self {
            id,
            version: 0,
            same_warehouse_moves: SameWarehouseMove::default(),
            catalog: Catalog::default(),
            devices: BTreeMap::new(),
            parts: BTreeMap::new(),
            loans: BTreeMap::new(),
            transfers: Vec::new(),
            restored_from: HashMap::new(),
        }
    }

    pub fn with_same_warehouse_moves(mut self, policy: SameWarehouseMove) -> Self {
        self.same_warehouse_moves = policy;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn device_record(&self, id: DeviceId) -> Option<&DeviceRecord> {
        self.devices.get(&id)
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id).and_then(DeviceRecord::as_live)
    }

    pub fn archived_device(&self, id: DeviceId) -> Option<&ArchivedDevice> {
        self.devices.get(&id).and_then(DeviceRecord::as_archived)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values().filter_map(DeviceRecord::as_live)
    }

    pub fn archive(&self) -> impl Iterator<Item = &ArchivedDevice> {
        self.devices.values().filter_map(DeviceRecord::as_archived)
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(&id)
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub fn loan(&self, id: LoanId) -> Option<&Loan> {
        self.loans.get(&id)
    }

    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values()
    }

    /// The active loan on a device, if any.
    pub fn loan_for(&self, device_id: DeviceId) -> Option<&Loan> {
        self.loans.values().find(|l| l.device_id == device_id)
    }

    /// Transfers in the order they were recorded.
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Every id the device has carried, current id first.
    ///
    /// A restore allocates a fresh id, so a device restored twice has three.
    pub fn device_lineage(&self, id: DeviceId) -> Vec<DeviceId> {
        let mut lineage = vec![id];
        let mut current = id;
        while let Some(&previous) = self.restored_from.get(&current) {
            if lineage.contains(&previous) {
                break;
            }
            lineage.push(previous);
            current = previous;
        }
        lineage
    }

    pub fn live_device_with_serial(&self, serial_number: &str) -> Option<&Device> {
        self.devices().find(|d| d.serial_number == serial_number)
    }

    /// Human label for a device: its name (or model) and serial number.
    pub fn device_label(&self, device: &Device) -> String {
        let name = match device.name {
            Some(id) => self.catalog.device_name_label(Some(id)),
            None => self.catalog.model_name(Some(device.model)),
        };
        format!("{name} ({})", device.serial_number)
    }

    fn part_name(&self, part: &Part) -> &str {
        match part.name {
            Some(id) => self.catalog.device_name_label(Some(id)),
            None => "part",
        }
    }

    fn warehouse_label(&self, id: Option<WarehouseId>) -> &str {
        match id {
            Some(_) => self.catalog.warehouse_name(id),
            None => "none",
        }
    }

    fn require_device(&self, id: DeviceId) -> DomainResult<&Device> {
        self.device(id)
            .ok_or_else(|| DomainError::not_found("device", id))
    }

    fn require_part(&self, id: PartId) -> DomainResult<&Part> {
        self.part(id).ok_or_else(|| DomainError::not_found("part", id))
    }

    fn ensure_new_device_id(&self, id: DeviceId) -> DomainResult<()> {
        let retired = self.restored_from.values().any(|&old| old == id);
        if self.devices.contains_key(&id) || retired {
            return Err(DomainError::already_exists(format!("device {id}")));
        }
        Ok(())
    }

    fn ensure_new_part_id(&self, id: PartId) -> DomainResult<()> {
        if self.parts.contains_key(&id) {
            return Err(DomainError::already_exists(format!("part {id}")));
        }
        Ok(())
    }

    /// Validate device fields against the catalog and the serial-number invariant.
    fn checked_device_details(
        &self,
        details: &DeviceDetails,
        editing: Option<DeviceId>,
    ) -> DomainResult<DeviceDetails> {
        let details = details.normalized()?;
        self.catalog
            .ensure_model_of(details.manufacturer, details.model)?;
        if let Some(name) = details.name {
            self.catalog.require_device_name(name)?;
        }
        if let Some(warehouse) = details.warehouse {
            self.catalog.require_warehouse(warehouse)?;
        }
        if let Some(holder) = self.live_device_with_serial(&details.serial_number) {
            if Some(holder.id) != editing {
                return Err(DomainError::DuplicateSerial(details.serial_number));
            }
        }
        Ok(details)
    }

    fn checked_part_details(&self, details: &PartDetails) -> DomainResult<PartDetails> {
        let details = details.normalized()?;
        if let Some(name) = details.name {
            self.catalog.require_device_name(name)?;
        }
        if let Some(warehouse) = details.warehouse {
            self.catalog.require_warehouse(warehouse)?;
        }
        Ok(details)
    }
}

impl AggregateRoot for Ledger {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Ledger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match &event.change {
            LedgerChange::WarehouseRegistered(w) => self.catalog.insert_warehouse(w.clone()),
            LedgerChange::WarehouseRemoved { warehouse_id } => {
                self.catalog.remove_warehouse(*warehouse_id);
                for record in self.devices.values_mut() {
                    if let DeviceRecord::Archived(a) = record {
                        if a.warehouse == Some(*warehouse_id) {
                            a.warehouse = None;
                        }
                    }
                }
            }
            LedgerChange::ManufacturerRegistered(m) => self.catalog.insert_manufacturer(m.clone()),
            LedgerChange::ManufacturerRemoved { manufacturer_id } => {
                let models = self.catalog.remove_manufacturer(*manufacturer_id);
                for record in self.devices.values_mut() {
                    if let DeviceRecord::Archived(a) = record {
                        if a.manufacturer == Some(*manufacturer_id) {
                            a.manufacturer = None;
                        }
                        if a.model.is_some_and(|m| models.contains(&m)) {
                            a.model = None;
                        }
                    }
                }
            }
            LedgerChange::DeviceModelRegistered(m) => self.catalog.insert_model(m.clone()),
            LedgerChange::DeviceModelRemoved { model_id } => {
                self.catalog.remove_model(*model_id);
                for record in self.devices.values_mut() {
                    if let DeviceRecord::Archived(a) = record {
                        if a.model == Some(*model_id) {
                            a.model = None;
                        }
                    }
                }
            }
            LedgerChange::DeviceNameRegistered(n) => self.catalog.insert_device_name(n.clone()),
            LedgerChange::DeviceNameRemoved { name_id } => {
                self.catalog.remove_device_name(*name_id);
                for record in self.devices.values_mut() {
                    if let DeviceRecord::Archived(a) = record {
                        if a.name == Some(*name_id) {
                            a.name = None;
                        }
                    }
                }
            }

            LedgerChange::DeviceIntaken(d) | LedgerChange::DeviceEdited(d) => {
                self.devices.insert(d.id, DeviceRecord::Live(d.clone()));
            }
            LedgerChange::DeviceDeleted { device_id } => {
                self.devices.remove(device_id);
            }
            LedgerChange::PartIntaken(p) | LedgerChange::PartEdited(p) => {
                self.parts.insert(p.id, p.clone());
            }
            LedgerChange::PartDeleted { part_id } => {
                self.parts.remove(part_id);
            }
            LedgerChange::PartRestocked { part_id, amount } => {
                if let Some(part) = self.parts.get_mut(part_id) {
                    part.quantity = part.quantity.saturating_add(*amount);
                }
            }
            LedgerChange::DeviceMoved(t) => {
                if let Some(DeviceRecord::Live(device)) = self.devices.get_mut(&t.device_id) {
                    device.warehouse = Some(t.destination);
                }
                self.transfers.push(t.clone());
            }
            LedgerChange::PartHandedOff { part_id, fragment } => {
                if let Some(part) = self.parts.get_mut(part_id) {
                    part.quantity = part.quantity.saturating_sub(fragment.quantity);
                }
                self.parts.insert(fragment.id, fragment.clone());
            }
            LedgerChange::DeviceHandedOff {
                archived,
                closed_loan,
            } => {
                if let Some(loan_id) = closed_loan {
                    self.loans.remove(loan_id);
                }
                self.devices
                    .insert(archived.id, DeviceRecord::Archived(archived.clone()));
            }
            LedgerChange::DeviceRestored {
                archived_id,
                device,
            } => {
                self.devices.remove(archived_id);
                self.devices
                    .insert(device.id, DeviceRecord::Live(device.clone()));
                self.restored_from.insert(device.id, *archived_id);
            }
            LedgerChange::DeviceCheckedOut(loan) => {
                self.loans.insert(loan.id, loan.clone());
            }
            LedgerChange::LoanReturned { loan_id } => {
                self.loans.remove(loan_id);
            }
            LedgerChange::AuditNoted => {}
        }

        // +1 per applied event, so the version equals the last sequence number.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let changes = match &command.action {
            LedgerAction::RegisterWarehouse { warehouse_id, name } => {
                self.handle_register_warehouse(*warehouse_id, name)?
            }
            LedgerAction::RemoveWarehouse { warehouse_id } => {
                self.handle_remove_warehouse(*warehouse_id)?
            }
            LedgerAction::RegisterManufacturer {
                manufacturer_id,
                name,
            } => self.handle_register_manufacturer(*manufacturer_id, name)?,
            LedgerAction::RemoveManufacturer { manufacturer_id } => {
                self.handle_remove_manufacturer(*manufacturer_id)?
            }
            LedgerAction::RegisterDeviceModel {
                model_id,
                manufacturer_id,
                name,
            } => self.handle_register_model(*model_id, *manufacturer_id, name)?,
            LedgerAction::RemoveDeviceModel { model_id } => self.handle_remove_model(*model_id)?,
            LedgerAction::RegisterDeviceName { name_id, name } => {
                self.handle_register_device_name(*name_id, name)?
            }
            LedgerAction::RemoveDeviceName { name_id } => {
                self.handle_remove_device_name(*name_id)?
            }

            LedgerAction::IntakeDevice { device_id, details } => {
                self.handle_intake_device(*device_id, details)?
            }
            LedgerAction::EditDevice { device_id, details } => {
                self.handle_edit_device(*device_id, details)?
            }
            LedgerAction::DeleteDevice { device_id } => self.handle_delete_device(*device_id)?,
            LedgerAction::IntakePart { part_id, details } => {
                self.handle_intake_part(*part_id, details)?
            }
            LedgerAction::EditPart { part_id, details } => {
                self.handle_edit_part(*part_id, details)?
            }
            LedgerAction::DeletePart { part_id } => self.handle_delete_part(*part_id)?,
            LedgerAction::RestockPart { part_id, amount } => {
                self.handle_restock(*part_id, *amount)?
            }
            LedgerAction::MoveDevice {
                device_id,
                transfer_id,
                destination,
            } => self.handle_move(command, *device_id, *transfer_id, *destination)?,
            LedgerAction::HandOffPart {
                part_id,
                fragment_id,
                amount,
                client_name,
                ticket_number,
                notes,
            } => self.handle_hand_off_part(
                *part_id,
                *fragment_id,
                *amount,
                client_name,
                ticket_number.as_deref(),
                notes,
            )?,
            LedgerAction::HandOffDevice {
                device_id,
                client_name,
                ticket_number,
                notes,
            } => self.handle_hand_off_device(
                command,
                *device_id,
                client_name.as_deref(),
                ticket_number.as_deref(),
                notes,
            )?,
            LedgerAction::RestoreDevice {
                archived_id,
                device_id,
            } => self.handle_restore(*archived_id, *device_id)?,
            LedgerAction::CheckoutDevice {
                loan_id,
                device_id,
                client_name,
                ticket_number,
            } => self.handle_checkout(command, *loan_id, *device_id, client_name, ticket_number)?,
            LedgerAction::ReturnLoan { loan_id } => self.handle_return(*loan_id)?,
            LedgerAction::DeduplicatePartSerials => self.handle_deduplicate_part_serials(),
            LedgerAction::AppendAuditNote { kind, description } => {
                let description = description.trim();
                if description.is_empty() {
                    return Err(DomainError::validation("audit description cannot be empty"));
                }
                vec![(
                    LedgerChange::AuditNoted,
                    Some(AuditRecord::new(
                        *kind,
                        AuditSubject::Unreferenced,
                        description,
                    )),
                )]
            }
        };

        Ok(changes
            .into_iter()
            .map(|(change, audit)| LedgerEvent {
                actor: command.actor.clone(),
                occurred_at: command.occurred_at,
                change,
                audit,
            })
            .collect())
    }
}

type Decided = Vec<(LedgerChange, Option<AuditRecord>)>;

fn audited(change: LedgerChange, kind: AuditKind, subject: AuditSubject, description: String) -> Decided {
    vec![(change, Some(AuditRecord::new(kind, subject, description)))]
}

fn unaudited(change: LedgerChange) -> Decided {
    vec![(change, None)]
}

fn positive_amount(amount: i64) -> DomainResult<u32> {
    match u32::try_from(amount) {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(DomainError::InvalidAmount(amount)),
    }
}

// Catalog.
impl Ledger {
    fn handle_register_warehouse(&self, id: WarehouseId, name: &str) -> DomainResult<Decided> {
        let name = required_label("warehouse name", name)?;
        if self.catalog.warehouse(id).is_some() || self.catalog.warehouse_name_taken(&name) {
            return Err(DomainError::already_exists(format!("warehouse '{name}'")));
        }
        Ok(unaudited(LedgerChange::WarehouseRegistered(Warehouse { id, name })))
    }

    fn handle_remove_warehouse(&self, id: WarehouseId) -> DomainResult<Decided> {
        let warehouse = self.catalog.require_warehouse(id)?;
        let referenced = self.devices().any(|d| d.warehouse == Some(id))
            || self.parts.values().any(|p| p.warehouse == Some(id))
            || self.transfers.iter().any(|t| t.touches(id));
        if referenced {
            return Err(DomainError::in_use(format!(
                "warehouse '{}' still holds stock or transfer history",
                warehouse.name
            )));
        }
        Ok(unaudited(LedgerChange::WarehouseRemoved { warehouse_id: id }))
    }

    fn handle_register_manufacturer(&self, id: ManufacturerId, name: &str) -> DomainResult<Decided> {
        let name = required_label("manufacturer name", name)?;
        if self.catalog.manufacturer(id).is_some() || self.catalog.manufacturer_name_taken(&name) {
            return Err(DomainError::already_exists(format!("manufacturer '{name}'")));
        }
        Ok(unaudited(LedgerChange::ManufacturerRegistered(Manufacturer { id, name })))
    }

    fn handle_remove_manufacturer(&self, id: ManufacturerId) -> DomainResult<Decided> {
        let manufacturer = self.catalog.require_manufacturer(id)?;
        if self.devices().any(|d| d.manufacturer == id) {
            return Err(DomainError::in_use(format!(
                "manufacturer '{}' is referenced by devices",
                manufacturer.name
            )));
        }
        Ok(unaudited(LedgerChange::ManufacturerRemoved { manufacturer_id: id }))
    }

    fn handle_register_model(
        &self,
        id: DeviceModelId,
        manufacturer: ManufacturerId,
        name: &str,
    ) -> DomainResult<Decided> {
        let name = required_label("model name", name)?;
        self.catalog.require_manufacturer(manufacturer)?;
        if self.catalog.model(id).is_some() || self.catalog.model_name_taken(manufacturer, &name) {
            return Err(DomainError::already_exists(format!(
                "model '{name}' for manufacturer '{}'",
                self.catalog.manufacturer_name(Some(manufacturer))
            )));
        }
        Ok(unaudited(LedgerChange::DeviceModelRegistered(DeviceModel {
            id,
            name,
            manufacturer,
        })))
    }

    fn handle_remove_model(&self, id: DeviceModelId) -> DomainResult<Decided> {
        let model = self.catalog.require_model(id)?;
        if self.devices().any(|d| d.model == id) {
            return Err(DomainError::in_use(format!(
                "model '{}' is referenced by devices",
                model.name
            )));
        }
        Ok(unaudited(LedgerChange::DeviceModelRemoved { model_id: id }))
    }

    fn handle_register_device_name(&self, id: DeviceNameId, name: &str) -> DomainResult<Decided> {
        let name = required_label("device name", name)?;
        if self.catalog.device_name(id).is_some() || self.catalog.device_name_taken(&name) {
            return Err(DomainError::already_exists(format!("device name '{name}'")));
        }
        Ok(unaudited(LedgerChange::DeviceNameRegistered(DeviceName { id, name })))
    }

    fn handle_remove_device_name(&self, id: DeviceNameId) -> DomainResult<Decided> {
        let name = self.catalog.require_device_name(id)?;
        let referenced = self.devices().any(|d| d.name == Some(id))
            || self.parts.values().any(|p| p.name == Some(id));
        if referenced {
            return Err(DomainError::in_use(format!(
                "device name '{}' is referenced by devices or parts",
                name.name
            )));
        }
        Ok(unaudited(LedgerChange::DeviceNameRemoved { name_id: id }))
    }
}

// Devices and parts.
impl Ledger {
    fn handle_intake_device(&self, id: DeviceId, details: &DeviceDetails) -> DomainResult<Decided> {
        self.ensure_new_device_id(id)?;
        let details = self.checked_device_details(details, None)?;
        let device = Device::from_details(id, details);
        let description = format!(
            "CREATE: Device {} - warehouse: {}",
            self.device_label(&device),
            self.warehouse_label(device.warehouse)
        );
        Ok(audited(
            LedgerChange::DeviceIntaken(device),
            AuditKind::Create,
            AuditSubject::Device(id),
            description,
        ))
    }

    fn handle_edit_device(&self, id: DeviceId, details: &DeviceDetails) -> DomainResult<Decided> {
        let mut device = self.require_device(id)?.clone();
        let details = self.checked_device_details(details, Some(id))?;
        device.update(details);
        let description = format!(
            "UPDATE: Device {} - warehouse: {}",
            self.device_label(&device),
            self.warehouse_label(device.warehouse)
        );
        Ok(audited(
            LedgerChange::DeviceEdited(device),
            AuditKind::Update,
            AuditSubject::Device(id),
            description,
        ))
    }

    fn handle_delete_device(&self, id: DeviceId) -> DomainResult<Decided> {
        let device = self.require_device(id)?;
        let description = format!(
            "DELETE: Device {} - warehouse: {}",
            self.device_label(device),
            self.warehouse_label(device.warehouse)
        );
        Ok(audited(
            LedgerChange::DeviceDeleted { device_id: id },
            AuditKind::Delete,
            AuditSubject::Device(id),
            description,
        ))
    }

    fn handle_intake_part(&self, id: PartId, details: &PartDetails) -> DomainResult<Decided> {
        self.ensure_new_part_id(id)?;
        let details = self.checked_part_details(details)?;
        let part = Part::from_details(id, details, self.version + 1);
        let description = format!(
            "CREATE: Part {} ({}, {} pcs) - warehouse: {}",
            self.part_name(&part),
            part.serial_label(),
            part.quantity,
            self.warehouse_label(part.warehouse)
        );
        Ok(audited(
            LedgerChange::PartIntaken(part),
            AuditKind::Create,
            AuditSubject::Part(id),
            description,
        ))
    }

    fn handle_edit_part(&self, id: PartId, details: &PartDetails) -> DomainResult<Decided> {
        let mut part = self.require_part(id)?.clone();
        let details = self.checked_part_details(details)?;
        part.update(details);
        let description = format!(
            "UPDATE: Part {} ({}, {} pcs) - warehouse: {}",
            self.part_name(&part),
            part.serial_label(),
            part.quantity,
            self.warehouse_label(part.warehouse)
        );
        Ok(audited(
            LedgerChange::PartEdited(part),
            AuditKind::Update,
            AuditSubject::Part(id),
            description,
        ))
    }

    fn part_deletion(&self, part: &Part) -> (LedgerChange, Option<AuditRecord>) {
        let description = format!(
            "DELETE: Part {} ({}, {} pcs) - warehouse: {}",
            self.part_name(part),
            part.serial_label(),
            part.quantity,
            self.warehouse_label(part.warehouse)
        );
        (
            LedgerChange::PartDeleted { part_id: part.id },
            Some(AuditRecord::new(
                AuditKind::Delete,
                AuditSubject::Part(part.id),
                description,
            )),
        )
    }

    fn handle_delete_part(&self, id: PartId) -> DomainResult<Decided> {
        let part = self.require_part(id)?;
        Ok(vec![self.part_deletion(part)])
    }

    fn handle_restock(&self, id: PartId, amount: i64) -> DomainResult<Decided> {
        let part = self.require_part(id)?;
        let added = positive_amount(amount)?;
        let total = part
            .quantity
            .checked_add(added)
            .ok_or(DomainError::InvalidAmount(amount))?;
        let description = format!(
            "Restocked: {} (+{added} pcs) -> total: {total} pcs",
            self.part_name(part)
        );
        Ok(audited(
            LedgerChange::PartRestocked {
                part_id: id,
                amount: added,
            },
            AuditKind::Restock,
            AuditSubject::Part(id),
            description,
        ))
    }

    /// Groups of parts sharing a serial number, oldest first within a group.
    fn serial_duplicates(&self) -> Vec<Vec<&Part>> {
        let mut by_serial: HashMap<&str, Vec<&Part>> = HashMap::new();
        for part in self.parts.values() {
            if let Some(serial) = part.serial_number.as_deref() {
                by_serial.entry(serial).or_default().push(part);
            }
        }
        let mut groups: Vec<Vec<&Part>> = by_serial
            .into_values()
            .filter(|group| group.len() > 1)
            .map(|mut group| {
                group.sort_by_key(|p| (p.created_seq, p.id));
                group
            })
            .collect();
        groups.sort_by_key(|group| group[0].created_seq);
        groups
    }

    fn handle_deduplicate_part_serials(&self) -> Decided {
        self.serial_duplicates()
            .into_iter()
            .flat_map(|group| group.into_iter().skip(1))
            .map(|duplicate| self.part_deletion(duplicate))
            .collect()
    }
}

// Moves, hand-offs and the archive.
impl Ledger {
    fn handle_move(
        &self,
        command: &LedgerCommand,
        device_id: DeviceId,
        transfer_id: TransferId,
        destination: WarehouseId,
    ) -> DomainResult<Decided> {
        let device = self.require_device(device_id)?;
        let target = self.catalog.require_warehouse(destination)?;
        if device.warehouse == Some(destination)
            && self.same_warehouse_moves == SameWarehouseMove::Reject
        {
            return Err(DomainError::validation(format!(
                "device is already in warehouse '{}'",
                target.name
            )));
        }
        if self.transfers.iter().any(|t| t.id == transfer_id) {
            return Err(DomainError::already_exists(format!("transfer {transfer_id}")));
        }

        let description = format!(
            "{} from {} -> {}",
            self.device_label(device),
            self.warehouse_label(device.warehouse),
            target.name
        );
        let transfer = Transfer {
            id: transfer_id,
            device_id,
            source: device.warehouse,
            destination,
            moved_at: command.occurred_at,
            actor: command.actor.as_ref().map(|a| a.id),
        };
        Ok(audited(
            LedgerChange::DeviceMoved(transfer),
            AuditKind::Transfer,
            AuditSubject::Device(device_id),
            description,
        ))
    }

    fn handle_hand_off_part(
        &self,
        part_id: PartId,
        fragment_id: PartId,
        amount: i64,
        client_name: &str,
        ticket_number: Option<&str>,
        notes: &str,
    ) -> DomainResult<Decided> {
        let part = self.require_part(part_id)?;
        if part.is_handed_off() {
            return Err(DomainError::validation(format!(
                "part {part_id} has already been handed off"
            )));
        }
        self.ensure_new_part_id(fragment_id)?;
        if amount <= 0 {
            return Err(DomainError::InvalidAmount(amount));
        }
        if amount > i64::from(part.quantity) {
            return Err(DomainError::InsufficientQuantity {
                requested: amount,
                available: part.quantity,
            });
        }
        let moved = u32::try_from(amount).map_err(|_| DomainError::InvalidAmount(amount))?;
        let client_name = required_label("client name", client_name)?;
        let ticket_number = optional_label("ticket number", ticket_number)?;

        // A fragment only keeps the serial when no other row already holds it.
        let serial_number = part.serial_number.clone().filter(|serial| {
            !self
                .parts
                .values()
                .any(|p| p.id != part_id && p.serial_number.as_deref() == Some(serial.as_str()))
        });

        let fragment = Part {
            id: fragment_id,
            name: part.name,
            manufacturer: part.manufacturer.clone(),
            model: part.model.clone(),
            serial_number,
            quantity: moved,
            warehouse: part.warehouse,
            client_name: Some(client_name),
            ticket_number,
            notes: notes.trim().to_string(),
            created_seq: self.version + 1,
        };
        let description = format!(
            "{} ({}) {moved} pcs to {}",
            self.part_name(&fragment),
            fragment.serial_label(),
            fragment.client_name.as_deref().unwrap_or_default()
        );
        Ok(audited(
            LedgerChange::PartHandedOff { part_id, fragment },
            AuditKind::HandoffPart,
            AuditSubject::Part(part_id),
            description,
        ))
    }

    fn handle_hand_off_device(
        &self,
        command: &LedgerCommand,
        device_id: DeviceId,
        client_name: Option<&str>,
        ticket_number: Option<&str>,
        notes: &str,
    ) -> DomainResult<Decided> {
        let device = self.require_device(device_id)?;
        let loan = self.loan_for(device_id);
        let (client_name, ticket_number) = match loan {
            Some(loan) => (
                Some(loan.client_name.clone()),
                Some(loan.ticket_number.clone()),
            ),
            None => (
                optional_label("client name", client_name)?,
                optional_label("ticket number", ticket_number)?,
            ),
        };

        let description = format!(
            "HANDOFF: {} to {}, ticket: {}",
            self.device_label(device),
            client_name.as_deref().unwrap_or("-"),
            ticket_number.as_deref().unwrap_or("-")
        );
        let archived = device.archive(
            client_name,
            ticket_number,
            notes.trim().to_string(),
            command.occurred_at,
        );
        Ok(audited(
            LedgerChange::DeviceHandedOff {
                archived,
                closed_loan: loan.map(|l| l.id),
            },
            AuditKind::HandoffDevice,
            AuditSubject::Device(device_id),
            description,
        ))
    }

    fn handle_restore(&self, archived_id: DeviceId, device_id: DeviceId) -> DomainResult<Decided> {
        let archived = self
            .archived_device(archived_id)
            .ok_or_else(|| DomainError::not_found("archived device", archived_id))?;
        self.ensure_new_device_id(device_id)?;
        let device = archived.restore(device_id).ok_or_else(|| {
            DomainError::validation(format!(
                "archived device {} lost its manufacturer or model",
                archived.serial_number
            ))
        })?;
        if self.live_device_with_serial(&device.serial_number).is_some() {
            return Err(DomainError::DuplicateSerial(device.serial_number));
        }

        let description = format!(
            "Restored: {} to warehouse {}",
            self.device_label(&device),
            self.warehouse_label(device.warehouse)
        );
        Ok(audited(
            LedgerChange::DeviceRestored {
                archived_id,
                device,
            },
            AuditKind::Restore,
            AuditSubject::Device(device_id),
            description,
        ))
    }
}

// Loans.
impl Ledger {
    fn handle_checkout(
        &self,
        command: &LedgerCommand,
        loan_id: LoanId,
        device_id: DeviceId,
        client_name: &str,
        ticket_number: &str,
    ) -> DomainResult<Decided> {
        let device = self.require_device(device_id)?;
        if self.loan_for(device_id).is_some() {
            return Err(DomainError::AlreadyLoaned(device_id));
        }
        if self.loans.contains_key(&loan_id) {
            return Err(DomainError::already_exists(format!("loan {loan_id}")));
        }
        let loan = Loan {
            id: loan_id,
            device_id,
            client_name: required_label("client name", client_name)?,
            ticket_number: required_label("ticket number", ticket_number)?,
            loaned_on: command.occurred_at.date_naive(),
        };
        let description = format!(
            "{} -> {}, ticket: {}",
            self.device_label(device),
            loan.client_name,
            loan.ticket_number
        );
        Ok(audited(
            LedgerChange::DeviceCheckedOut(loan),
            AuditKind::Loan,
            AuditSubject::Device(device_id),
            description,
        ))
    }

    fn handle_return(&self, loan_id: LoanId) -> DomainResult<Decided> {
        let loan = self
            .loan(loan_id)
            .ok_or_else(|| DomainError::not_found("loan", loan_id))?;
        // The device may have been deleted while on loan.
        let subject = match self.device(loan.device_id) {
            Some(device) => self.device_label(device),
            None => format!("device {}", loan.device_id),
        };
        let description = format!("RETURN: {subject} from {}", loan.client_name);
        Ok(audited(
            LedgerChange::LoanReturned { loan_id },
            AuditKind::Return,
            AuditSubject::Device(loan.device_id),
            description,
        ))
    }
}
