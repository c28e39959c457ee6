use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    DeviceId, DeviceModelId, DeviceNameId, DomainResult, ManufacturerId, WarehouseId,
};

use crate::catalog::{optional_label, required_label};

/// Operator-editable device fields, used for intake and edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDetails {
    pub name: Option<DeviceNameId>,
    pub manufacturer: ManufacturerId,
    pub model: DeviceModelId,
    pub serial_number: String,
    pub secondary_index: Option<String>,
    pub notes: String,
    pub quantity: u32,
    /// `None` means in transit / unassigned.
    pub warehouse: Option<WarehouseId>,
    pub client_name: Option<String>,
    pub ticket_number: Option<String>,
}

impl DeviceDetails {
    /// A single unit with no optional fields set.
    pub fn new(
        manufacturer: ManufacturerId,
        model: DeviceModelId,
        serial_number: impl Into<String>,
    ) -> Self {
        Self {
            name: None,
            manufacturer,
            model,
            serial_number: serial_number.into(),
            secondary_index: None,
            notes: String::new(),
            quantity: 1,
            warehouse: None,
            client_name: None,
            ticket_number: None,
        }
    }

    pub fn named(mut self, name: DeviceNameId) -> Self {
        self.name = Some(name);
        self
    }

    pub fn in_warehouse(mut self, warehouse: WarehouseId) -> Self {
        self.warehouse = Some(warehouse);
        self
    }

    /// Trimmed copy with blank optional fields collapsed to `None`.
    pub fn normalized(&self) -> DomainResult<Self> {
        Ok(Self {
            name: self.name,
            manufacturer: self.manufacturer,
            model: self.model,
            serial_number: required_label("serial number", &self.serial_number)?,
            secondary_index: optional_label("secondary index", self.secondary_index.as_deref())?,
            notes: self.notes.trim().to_string(),
            quantity: self.quantity,
            warehouse: self.warehouse,
            client_name: optional_label("client name", self.client_name.as_deref())?,
            ticket_number: optional_label("ticket number", self.ticket_number.as_deref())?,
        })
    }
}

/// A device present in live inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: Option<DeviceNameId>,
    pub manufacturer: ManufacturerId,
    pub model: DeviceModelId,
    pub serial_number: String,
    pub secondary_index: Option<String>,
    pub notes: String,
    pub quantity: u32,
    pub warehouse: Option<WarehouseId>,
    pub client_name: Option<String>,
    pub ticket_number: Option<String>,
}

impl Device {
    pub fn from_details(id: DeviceId, details: DeviceDetails) -> Self {
        Self {
            id,
            name: details.name,
            manufacturer: details.manufacturer,
            model: details.model,
            serial_number: details.serial_number,
            secondary_index: details.secondary_index,
            notes: details.notes,
            quantity: details.quantity,
            warehouse: details.warehouse,
            client_name: details.client_name,
            ticket_number: details.ticket_number,
        }
    }

    pub fn update(&mut self, details: DeviceDetails) {
        *self = Self::from_details(self.id, details);
    }

    /// Snapshot taken at the moment of a permanent hand-off.
    pub fn archive(
        &self,
        client_name: Option<String>,
        ticket_number: Option<String>,
        notes: String,
        archived_at: DateTime<Utc>,
    ) -> ArchivedDevice {
        ArchivedDevice {
            id: self.id,
            name: self.name,
            manufacturer: Some(self.manufacturer),
            model: Some(self.model),
            serial_number: self.serial_number.clone(),
            quantity: self.quantity,
            warehouse: self.warehouse,
            client_name,
            ticket_number,
            notes,
            archived_at,
        }
    }
}

/// A device permanently handed off to a client.
///
/// Catalog references are cleared when the referenced record is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedDevice {
    pub id: DeviceId,
    pub name: Option<DeviceNameId>,
    pub manufacturer: Option<ManufacturerId>,
    pub model: Option<DeviceModelId>,
    pub serial_number: String,
    pub quantity: u32,
    pub warehouse: Option<WarehouseId>,
    pub client_name: Option<String>,
    pub ticket_number: Option<String>,
    pub notes: String,
    pub archived_at: DateTime<Utc>,
}

impl ArchivedDevice {
    /// Live device recreated from this snapshot under a new identity.
    ///
    /// Client and ticket are left empty. Returns `None` when the snapshot lost
    /// its manufacturer or model.
    pub fn restore(&self, id: DeviceId) -> Option<Device> {
        Some(Device {
            id,
            name: self.name,
            manufacturer: self.manufacturer?,
            model: self.model?,
            serial_number: self.serial_number.clone(),
            secondary_index: None,
            notes: self.notes.clone(),
            quantity: self.quantity,
            warehouse: self.warehouse,
            client_name: None,
            ticket_number: None,
        })
    }
}

/// Lifecycle state of a device: present in the ledger or in the archive, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeviceRecord {
    Live(Device),
    Archived(ArchivedDevice),
}

impl DeviceRecord {
    pub fn id(&self) -> DeviceId {
        match self {
            DeviceRecord::Live(d) => d.id,
            DeviceRecord::Archived(a) => a.id,
        }
    }

    pub fn serial_number(&self) -> &str {
        match self {
            DeviceRecord::Live(d) => &d.serial_number,
            DeviceRecord::Archived(a) => &a.serial_number,
        }
    }

    pub fn as_live(&self) -> Option<&Device> {
        match self {
            DeviceRecord::Live(d) => Some(d),
            DeviceRecord::Archived(_) => None,
        }
    }

    pub fn as_archived(&self) -> Option<&ArchivedDevice> {
        match self {
            DeviceRecord::Live(_) => None,
            DeviceRecord::Archived(a) => Some(a),
        }
    }
}
