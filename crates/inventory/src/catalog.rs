//! Reference data shared by devices and parts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockroom_core::{
    DeviceModelId, DeviceNameId, DomainError, DomainResult, ManufacturerId, WarehouseId,
};

/// Longest accepted catalog name, serial number or client field.
pub const MAX_LABEL_LEN: usize = 100;

/// Trim a required label and check its length.
pub fn required_label(field: &str, raw: &str) -> DomainResult<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > MAX_LABEL_LEN {
        return Err(DomainError::validation(format!(
            "{field} cannot be longer than {MAX_LABEL_LEN} characters"
        )));
    }
    Ok(value.to_string())
}

/// Trim an optional label; blank input becomes `None`.
pub fn optional_label(field: &str, raw: Option<&str>) -> DomainResult<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => required_label(field, value).map(Some),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: ManufacturerId,
    pub name: String,
}

/// A model name, unique per manufacturer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceModel {
    pub id: DeviceModelId,
    pub name: String,
    pub manufacturer: ManufacturerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceName {
    pub id: DeviceNameId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    manufacturers: BTreeMap<ManufacturerId, Manufacturer>,
    models: BTreeMap<DeviceModelId, DeviceModel>,
    device_names: BTreeMap<DeviceNameId, DeviceName>,
}

impl Catalog {
    pub fn warehouse(&self, id: WarehouseId) -> Option<&Warehouse> {
        self.warehouses.get(&id)
    }

    pub fn manufacturer(&self, id: ManufacturerId) -> Option<&Manufacturer> {
        self.manufacturers.get(&id)
    }

    pub fn model(&self, id: DeviceModelId) -> Option<&DeviceModel> {
        self.models.get(&id)
    }

    pub fn device_name(&self, id: DeviceNameId) -> Option<&DeviceName> {
        self.device_names.get(&id)
    }

    /// Warehouses ordered by name.
    pub fn warehouses(&self) -> Vec<&Warehouse> {
        let mut all: Vec<&Warehouse> = self.warehouses.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Manufacturers ordered by name.
    pub fn manufacturers(&self) -> Vec<&Manufacturer> {
        let mut all: Vec<&Manufacturer> = self.manufacturers.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Models ordered by manufacturer name, then model name.
    pub fn models(&self) -> Vec<&DeviceModel> {
        let mut all: Vec<&DeviceModel> = self.models.values().collect();
        all.sort_by(|a, b| {
            self.manufacturer_name(Some(a.manufacturer))
                .cmp(self.manufacturer_name(Some(b.manufacturer)))
                .then_with(|| a.name.cmp(&b.name))
        });
        all
    }

    pub fn models_of(&self, manufacturer: ManufacturerId) -> impl Iterator<Item = &DeviceModel> {
        self.models
            .values()
            .filter(move |m| m.manufacturer == manufacturer)
    }

    /// Device names ordered by name.
    pub fn device_names(&self) -> Vec<&DeviceName> {
        let mut all: Vec<&DeviceName> = self.device_names.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn warehouse_name(&self, id: Option<WarehouseId>) -> &str {
        id.and_then(|id| self.warehouse(id))
            .map(|w| w.name.as_str())
            .unwrap_or_default()
    }

    pub fn manufacturer_name(&self, id: Option<ManufacturerId>) -> &str {
        id.and_then(|id| self.manufacturer(id))
            .map(|m| m.name.as_str())
            .unwrap_or_default()
    }

    pub fn model_name(&self, id: Option<DeviceModelId>) -> &str {
        id.and_then(|id| self.model(id))
            .map(|m| m.name.as_str())
            .unwrap_or_default()
    }

    pub fn device_name_label(&self, id: Option<DeviceNameId>) -> &str {
        id.and_then(|id| self.device_name(id))
            .map(|n| n.name.as_str())
            .unwrap_or_default()
    }

    pub fn require_warehouse(&self, id: WarehouseId) -> DomainResult<&Warehouse> {
        self.warehouse(id)
            .ok_or_else(|| DomainError::not_found("warehouse", id))
    }

    pub fn require_manufacturer(&self, id: ManufacturerId) -> DomainResult<&Manufacturer> {
        self.manufacturer(id)
            .ok_or_else(|| DomainError::not_found("manufacturer", id))
    }

    pub fn require_model(&self, id: DeviceModelId) -> DomainResult<&DeviceModel> {
        self.model(id)
            .ok_or_else(|| DomainError::not_found("device model", id))
    }

    pub fn require_device_name(&self, id: DeviceNameId) -> DomainResult<&DeviceName> {
        self.device_name(id)
            .ok_or_else(|| DomainError::not_found("device name", id))
    }

    /// The model must exist and belong to the manufacturer.
    pub fn ensure_model_of(
        &self,
        manufacturer: ManufacturerId,
        model: DeviceModelId,
    ) -> DomainResult<()> {
        self.require_manufacturer(manufacturer)?;
        let found = self.require_model(model)?;
        if found.manufacturer != manufacturer {
            return Err(DomainError::validation(format!(
                "model '{}' does not belong to manufacturer '{}'",
                found.name,
                self.manufacturer_name(Some(manufacturer))
            )));
        }
        Ok(())
    }

    pub fn warehouse_name_taken(&self, name: &str) -> bool {
        self.warehouses.values().any(|w| w.name == name)
    }

    pub fn manufacturer_name_taken(&self, name: &str) -> bool {
        self.manufacturers.values().any(|m| m.name == name)
    }

    pub fn model_name_taken(&self, manufacturer: ManufacturerId, name: &str) -> bool {
        self.models_of(manufacturer).any(|m| m.name == name)
    }

    pub fn device_name_taken(&self, name: &str) -> bool {
        self.device_names.values().any(|n| n.name == name)
    }

    pub(crate) fn insert_warehouse(&mut self, warehouse: Warehouse) {
        self.warehouses.insert(warehouse.id, warehouse);
    }

    pub(crate) fn remove_warehouse(&mut self, id: WarehouseId) {
        self.warehouses.remove(&id);
    }

    pub(crate) fn insert_manufacturer(&mut self, manufacturer: Manufacturer) {
        self.manufacturers.insert(manufacturer.id, manufacturer);
    }

    /// Removes the manufacturer together with its models; returns the removed model ids.
    pub(crate) fn remove_manufacturer(&mut self, id: ManufacturerId) -> Vec<DeviceModelId> {
        self.manufacturers.remove(&id);
        let orphaned: Vec<DeviceModelId> = self.models_of(id).map(|m| m.id).collect();
        for model in &orphaned {
            self.models.remove(model);
        }
        orphaned
    }

    pub(crate) fn insert_model(&mut self, model: DeviceModel) {
        self.models.insert(model.id, model);
    }

    pub(crate) fn remove_model(&mut self, id: DeviceModelId) {
        self.models.remove(&id);
    }

    pub(crate) fn insert_device_name(&mut self, name: DeviceName) {
        self.device_names.insert(name.id, name);
    }

    pub(crate) fn remove_device_name(&mut self, id: DeviceNameId) {
        self.device_names.remove(&id);
    }
}
