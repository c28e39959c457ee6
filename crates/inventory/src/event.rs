use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_audit::AuditRecord;
use stockroom_core::{
    Actor, DeviceId, DeviceModelId, DeviceNameId, LoanId, ManufacturerId, PartId, WarehouseId,
};
use stockroom_events::Event;

use crate::catalog::{DeviceModel, DeviceName, Manufacturer, Warehouse};
use crate::{ArchivedDevice, Device, Loan, Part, Transfer};

/// One committed change to the ledger.
///
/// `audit` is decided together with the change, so the audit trail can never
/// diverge from the state it describes. Catalog changes carry no audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub actor: Option<Actor>,
    pub occurred_at: DateTime<Utc>,
    pub change: LedgerChange,
    pub audit: Option<AuditRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerChange {
    WarehouseRegistered(Warehouse),
    WarehouseRemoved { warehouse_id: WarehouseId },
    ManufacturerRegistered(Manufacturer),
    ManufacturerRemoved { manufacturer_id: ManufacturerId },
    DeviceModelRegistered(DeviceModel),
    DeviceModelRemoved { model_id: DeviceModelId },
    DeviceNameRegistered(DeviceName),
    DeviceNameRemoved { name_id: DeviceNameId },

    DeviceIntaken(Device),
    DeviceEdited(Device),
    DeviceDeleted { device_id: DeviceId },
    PartIntaken(Part),
    PartEdited(Part),
    PartDeleted { part_id: PartId },
    PartRestocked { part_id: PartId, amount: u32 },
    DeviceMoved(Transfer),
    /// The source part loses `fragment.quantity` units.
    PartHandedOff { part_id: PartId, fragment: Part },
    /// The device leaves the ledger; the loan, if any, is closed with it.
    DeviceHandedOff {
        archived: ArchivedDevice,
        closed_loan: Option<LoanId>,
    },
    DeviceRestored { archived_id: DeviceId, device: Device },
    DeviceCheckedOut(Loan),
    LoanReturned { loan_id: LoanId },
    AuditNoted,
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match &self.change {
            LedgerChange::WarehouseRegistered(_) => "stockroom.warehouse.registered",
            LedgerChange::WarehouseRemoved { .. } => "stockroom.warehouse.removed",
            LedgerChange::ManufacturerRegistered(_) => "stockroom.manufacturer.registered",
            LedgerChange::ManufacturerRemoved { .. } => "stockroom.manufacturer.removed",
            LedgerChange::DeviceModelRegistered(_) => "stockroom.device_model.registered",
            LedgerChange::DeviceModelRemoved { .. } => "stockroom.device_model.removed",
            LedgerChange::DeviceNameRegistered(_) => "stockroom.device_name.registered",
            LedgerChange::DeviceNameRemoved { .. } => "stockroom.device_name.removed",
            LedgerChange::DeviceIntaken(_) => "stockroom.device.intaken",
            LedgerChange::DeviceEdited(_) => "stockroom.device.edited",
            LedgerChange::DeviceDeleted { .. } => "stockroom.device.deleted",
            LedgerChange::PartIntaken(_) => "stockroom.part.intaken",
            LedgerChange::PartEdited(_) => "stockroom.part.edited",
            LedgerChange::PartDeleted { .. } => "stockroom.part.deleted",
            LedgerChange::PartRestocked { .. } => "stockroom.part.restocked",
            LedgerChange::DeviceMoved(_) => "stockroom.device.moved",
            LedgerChange::PartHandedOff { .. } => "stockroom.part.handed_off",
            LedgerChange::DeviceHandedOff { .. } => "stockroom.device.handed_off",
            LedgerChange::DeviceRestored { .. } => "stockroom.device.restored",
            LedgerChange::DeviceCheckedOut(_) => "stockroom.loan.checked_out",
            LedgerChange::LoanReturned { .. } => "stockroom.loan.returned",
            LedgerChange::AuditNoted => "stockroom.audit.noted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
