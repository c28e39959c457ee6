use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_audit::AuditKind;
use stockroom_core::{
    Actor, DeviceId, DeviceModelId, DeviceNameId, LoanId, ManufacturerId, PartId, TransferId,
    WarehouseId,
};

use crate::{DeviceDetails, PartDetails};

/// A mutation request against the ledger, stamped with who asked and when.
///
/// Identifiers of records a command creates are chosen by the caller so that
/// handling stays deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCommand {
    /// `None` for system-initiated commands.
    pub actor: Option<Actor>,
    pub occurred_at: DateTime<Utc>,
    pub action: LedgerAction,
}

impl LedgerCommand {
    pub fn new(actor: Option<Actor>, occurred_at: DateTime<Utc>, action: LedgerAction) -> Self {
        Self {
            actor,
            occurred_at,
            action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAction {
    RegisterWarehouse {
        warehouse_id: WarehouseId,
        name: String,
    },
    RemoveWarehouse {
        warehouse_id: WarehouseId,
    },
    RegisterManufacturer {
        manufacturer_id: ManufacturerId,
        name: String,
    },
    /// Also removes the manufacturer's models.
    RemoveManufacturer {
        manufacturer_id: ManufacturerId,
    },
    RegisterDeviceModel {
        model_id: DeviceModelId,
        manufacturer_id: ManufacturerId,
        name: String,
    },
    RemoveDeviceModel {
        model_id: DeviceModelId,
    },
    RegisterDeviceName {
        name_id: DeviceNameId,
        name: String,
    },
    RemoveDeviceName {
        name_id: DeviceNameId,
    },

    IntakeDevice {
        device_id: DeviceId,
        details: DeviceDetails,
    },
    EditDevice {
        device_id: DeviceId,
        details: DeviceDetails,
    },
    /// Leaves any loan on the device in place.
    DeleteDevice {
        device_id: DeviceId,
    },
    IntakePart {
        part_id: PartId,
        details: PartDetails,
    },
    EditPart {
        part_id: PartId,
        details: PartDetails,
    },
    DeletePart {
        part_id: PartId,
    },
    RestockPart {
        part_id: PartId,
        amount: i64,
    },
    MoveDevice {
        device_id: DeviceId,
        transfer_id: TransferId,
        destination: WarehouseId,
    },
    /// Split `amount` units off a part into a new row owned by a client.
    HandOffPart {
        part_id: PartId,
        fragment_id: PartId,
        amount: i64,
        client_name: String,
        ticket_number: Option<String>,
        notes: String,
    },
    /// Permanently hand a device to a client. An active loan's client and
    /// ticket win over the ones supplied here.
    HandOffDevice {
        device_id: DeviceId,
        client_name: Option<String>,
        ticket_number: Option<String>,
        notes: String,
    },
    RestoreDevice {
        archived_id: DeviceId,
        device_id: DeviceId,
    },
    CheckoutDevice {
        loan_id: LoanId,
        device_id: DeviceId,
        client_name: String,
        ticket_number: String,
    },
    ReturnLoan {
        loan_id: LoanId,
    },
    /// Keep the oldest part per serial number and delete the rest.
    DeduplicatePartSerials,
    /// Record a free-text audit entry with no structured subject.
    AppendAuditNote {
        kind: AuditKind,
        description: String,
    },
}
