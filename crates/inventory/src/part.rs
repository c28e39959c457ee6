use serde::{Deserialize, Serialize};

use stockroom_core::{DeviceNameId, DomainResult, PartId, WarehouseId};

use crate::catalog::optional_label;

/// Operator-editable part fields, used for intake and edit.
///
/// Manufacturer and model are free text, unlike on devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDetails {
    pub name: Option<DeviceNameId>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: u32,
    pub warehouse: Option<WarehouseId>,
    pub client_name: Option<String>,
    pub ticket_number: Option<String>,
    pub notes: String,
}

impl PartDetails {
    pub fn normalized(&self) -> DomainResult<Self> {
        Ok(Self {
            name: self.name,
            manufacturer: optional_label("manufacturer", self.manufacturer.as_deref())?,
            model: optional_label("model", self.model.as_deref())?,
            serial_number: optional_label("serial number", self.serial_number.as_deref())?,
            quantity: self.quantity,
            warehouse: self.warehouse,
            client_name: optional_label("client name", self.client_name.as_deref())?,
            ticket_number: optional_label("ticket number", self.ticket_number.as_deref())?,
            notes: self.notes.trim().to_string(),
        })
    }
}

/// A row of spare parts.
///
/// A part with a client name has been handed off and no longer counts as stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub name: Option<DeviceNameId>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: u32,
    pub warehouse: Option<WarehouseId>,
    pub client_name: Option<String>,
    pub ticket_number: Option<String>,
    pub notes: String,
    /// Ledger version at which the row was created; orders rows by age.
    pub created_seq: u64,
}

impl Part {
    pub fn from_details(id: PartId, details: PartDetails, created_seq: u64) -> Self {
        Self {
            id,
            name: details.name,
            manufacturer: details.manufacturer,
            model: details.model,
            serial_number: details.serial_number,
            quantity: details.quantity,
            warehouse: details.warehouse,
            client_name: details.client_name,
            ticket_number: details.ticket_number,
            notes: details.notes,
            created_seq,
        }
    }

    pub fn update(&mut self, details: PartDetails) {
        *self = Self::from_details(self.id, details, self.created_seq);
    }

    pub fn is_handed_off(&self) -> bool {
        self.client_name.is_some()
    }

    pub fn serial_label(&self) -> &str {
        self.serial_number.as_deref().unwrap_or("no serial")
    }
}
