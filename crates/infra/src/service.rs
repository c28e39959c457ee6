//! Caller-facing inventory operations.
//!
//! Every call names its [`Principal`]. Mutations need `inventory.write` and
//! are stamped with the caller and the current time before dispatch; the ids
//! of records a call creates are generated here and returned.

use chrono::Utc;
use tracing::{info, instrument, warn};

use stockroom_audit::{AuditEntry, AuditKind, LegacyHistory};
use stockroom_auth::{Permission, Principal, WarehouseScope, authorize};
use stockroom_core::{
    DeviceId, DeviceModelId, DeviceNameId, DomainError, LoanId, ManufacturerId, PartId,
    TransferId, WarehouseId,
};
use stockroom_inventory::{
    Dashboard, DashboardFilter, DeviceDetails, DeviceRecord, Ledger, LedgerAction, LedgerCommand,
    PartDetails, TimelineEvent, build_timeline,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::StockroomConfig;
use crate::event_store::{EventStore, StoredEvent};

pub struct InventoryService<S> {
    dispatcher: CommandDispatcher<S>,
    legacy_history: LegacyHistory,
}

impl<S> InventoryService<S>
where
    S: EventStore,
{
    pub fn new(dispatcher: CommandDispatcher<S>, legacy_history: LegacyHistory) -> Self {
        Self {
            dispatcher,
            legacy_history,
        }
    }

    /// Open the configured ledger on `store`.
    pub fn open(store: S, config: &StockroomConfig) -> Result<Self, DispatchError> {
        let dispatcher =
            CommandDispatcher::open(store, config.ledger_id, config.same_warehouse_moves)?;
        Ok(Self::new(dispatcher, config.legacy_history))
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S> {
        &self.dispatcher
    }

    #[instrument(skip(self, principal, action), fields(user = %principal.actor.id), err)]
    fn execute(
        &self,
        principal: &Principal,
        action: LedgerAction,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        authorize(principal, &Permission::INVENTORY_WRITE).inspect_err(|e| {
            warn!(error = %e, role = %principal.role, "mutation refused");
        })?;
        let command = LedgerCommand::new(Some(principal.actor.clone()), Utc::now(), action);
        self.dispatcher.dispatch(command)
    }

    fn read<T>(
        &self,
        principal: &Principal,
        required: &Permission,
        f: impl FnOnce(&Ledger, &stockroom_audit::AuditLog) -> T,
    ) -> Result<T, DispatchError> {
        authorize(principal, required)?;
        self.dispatcher.read(f)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────

    pub fn register_warehouse(
        &self,
        principal: &Principal,
        name: &str,
    ) -> Result<WarehouseId, DispatchError> {
        let warehouse_id = WarehouseId::new();
        self.execute(
            principal,
            LedgerAction::RegisterWarehouse {
                warehouse_id,
                name: name.to_string(),
            },
        )?;
        Ok(warehouse_id)
    }

    pub fn remove_warehouse(
        &self,
        principal: &Principal,
        warehouse_id: WarehouseId,
    ) -> Result<(), DispatchError> {
        self.execute(principal, LedgerAction::RemoveWarehouse { warehouse_id })?;
        Ok(())
    }

    pub fn register_manufacturer(
        &self,
        principal: &Principal,
        name: &str,
    ) -> Result<ManufacturerId, DispatchError> {
        let manufacturer_id = ManufacturerId::new();
        self.execute(
            principal,
            LedgerAction::RegisterManufacturer {
                manufacturer_id,
                name: name.to_string(),
            },
        )?;
        Ok(manufacturer_id)
    }

    /// Removes the manufacturer's models too.
    pub fn remove_manufacturer(
        &self,
        principal: &Principal,
        manufacturer_id: ManufacturerId,
    ) -> Result<(), DispatchError> {
        self.execute(principal, LedgerAction::RemoveManufacturer { manufacturer_id })?;
        Ok(())
    }

    pub fn register_device_model(
        &self,
        principal: &Principal,
        manufacturer_id: ManufacturerId,
        name: &str,
    ) -> Result<DeviceModelId, DispatchError> {
        let model_id = DeviceModelId::new();
        self.execute(
            principal,
            LedgerAction::RegisterDeviceModel {
                model_id,
                manufacturer_id,
                name: name.to_string(),
            },
        )?;
        Ok(model_id)
    }

    pub fn remove_device_model(
        &self,
        principal: &Principal,
        model_id: DeviceModelId,
    ) -> Result<(), DispatchError> {
        self.execute(principal, LedgerAction::RemoveDeviceModel { model_id })?;
        Ok(())
    }

    pub fn register_device_name(
        &self,
        principal: &Principal,
        name: &str,
    ) -> Result<DeviceNameId, DispatchError> {
        let name_id = DeviceNameId::new();
        self.execute(
            principal,
            LedgerAction::RegisterDeviceName {
                name_id,
                name: name.to_string(),
            },
        )?;
        Ok(name_id)
    }

    pub fn remove_device_name(
        &self,
        principal: &Principal,
        name_id: DeviceNameId,
    ) -> Result<(), DispatchError> {
        self.execute(principal, LedgerAction::RemoveDeviceName { name_id })?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Devices & loans
    // ─────────────────────────────────────────────────────────────────────

    pub fn intake_device(
        &self,
        principal: &Principal,
        details: DeviceDetails,
    ) -> Result<DeviceId, DispatchError> {
        let device_id = DeviceId::new();
        self.execute(principal, LedgerAction::IntakeDevice { device_id, details })?;
        info!(%device_id, "device taken in");
        Ok(device_id)
    }

    pub fn edit_device(
        &self,
        principal: &Principal,
        device_id: DeviceId,
        details: DeviceDetails,
    ) -> Result<(), DispatchError> {
        self.execute(principal, LedgerAction::EditDevice { device_id, details })?;
        Ok(())
    }

    pub fn delete_device(
        &self,
        principal: &Principal,
        device_id: DeviceId,
    ) -> Result<(), DispatchError> {
        self.execute(principal, LedgerAction::DeleteDevice { device_id })?;
        Ok(())
    }

    pub fn move_device(
        &self,
        principal: &Principal,
        device_id: DeviceId,
        destination: WarehouseId,
    ) -> Result<TransferId, DispatchError> {
        let transfer_id = TransferId::new();
        self.execute(
            principal,
            LedgerAction::MoveDevice {
                device_id,
                transfer_id,
                destination,
            },
        )?;
        Ok(transfer_id)
    }

    /// Archive the device for good. An active loan supplies client and ticket.
    pub fn hand_off_device(
        &self,
        principal: &Principal,
        device_id: DeviceId,
        client_name: Option<&str>,
        ticket_number: Option<&str>,
        notes: &str,
    ) -> Result<(), DispatchError> {
        self.execute(
            principal,
            LedgerAction::HandOffDevice {
                device_id,
                client_name: client_name.map(str::to_string),
                ticket_number: ticket_number.map(str::to_string),
                notes: notes.to_string(),
            },
        )?;
        Ok(())
    }

    /// Bring an archived device back; it gets a new id.
    pub fn restore_device(
        &self,
        principal: &Principal,
        archived_id: DeviceId,
    ) -> Result<DeviceId, DispatchError> {
        let device_id = DeviceId::new();
        self.execute(
            principal,
            LedgerAction::RestoreDevice {
                archived_id,
                device_id,
            },
        )?;
        Ok(device_id)
    }

    pub fn checkout_device(
        &self,
        principal: &Principal,
        device_id: DeviceId,
        client_name: &str,
        ticket_number: &str,
    ) -> Result<LoanId, DispatchError> {
        let loan_id = LoanId::new();
        self.execute(
            principal,
            LedgerAction::CheckoutDevice {
                loan_id,
                device_id,
                client_name: client_name.to_string(),
                ticket_number: ticket_number.to_string(),
            },
        )?;
        Ok(loan_id)
    }

    pub fn return_loan(&self, principal: &Principal, loan_id: LoanId) -> Result<(), DispatchError> {
        self.execute(principal, LedgerAction::ReturnLoan { loan_id })?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Parts
    // ─────────────────────────────────────────────────────────────────────

    pub fn intake_part(
        &self,
        principal: &Principal,
        details: PartDetails,
    ) -> Result<PartId, DispatchError> {
        let part_id = PartId::new();
        self.execute(principal, LedgerAction::IntakePart { part_id, details })?;
        Ok(part_id)
    }

    pub fn edit_part(
        &self,
        principal: &Principal,
        part_id: PartId,
        details: PartDetails,
    ) -> Result<(), DispatchError> {
        self.execute(principal, LedgerAction::EditPart { part_id, details })?;
        Ok(())
    }

    pub fn delete_part(&self, principal: &Principal, part_id: PartId) -> Result<(), DispatchError> {
        self.execute(principal, LedgerAction::DeletePart { part_id })?;
        Ok(())
    }

    pub fn restock_part(
        &self,
        principal: &Principal,
        part_id: PartId,
        amount: i64,
    ) -> Result<(), DispatchError> {
        self.execute(principal, LedgerAction::RestockPart { part_id, amount })?;
        Ok(())
    }

    /// Split `amount` units off a part to a client. Returns the new row's id.
    pub fn hand_off_part(
        &self,
        principal: &Principal,
        part_id: PartId,
        amount: i64,
        client_name: &str,
        ticket_number: Option<&str>,
        notes: &str,
    ) -> Result<PartId, DispatchError> {
        let fragment_id = PartId::new();
        self.execute(
            principal,
            LedgerAction::HandOffPart {
                part_id,
                fragment_id,
                amount,
                client_name: client_name.to_string(),
                ticket_number: ticket_number.map(str::to_string),
                notes: notes.to_string(),
            },
        )?;
        Ok(fragment_id)
    }

    /// Returns how many duplicate parts were deleted.
    pub fn deduplicate_part_serials(&self, principal: &Principal) -> Result<usize, DispatchError> {
        let committed = self.execute(principal, LedgerAction::DeduplicatePartSerials)?;
        Ok(committed.len())
    }

    pub fn append_audit_note(
        &self,
        principal: &Principal,
        kind: AuditKind,
        description: &str,
    ) -> Result<(), DispatchError> {
        self.execute(
            principal,
            LedgerAction::AppendAuditNote {
                kind,
                description: description.to_string(),
            },
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Dashboard for `filter`; observers only ever see their own warehouse.
    pub fn dashboard(
        &self,
        principal: &Principal,
        filter: &DashboardFilter,
    ) -> Result<Dashboard, DispatchError> {
        self.scoped_dashboard(principal, &Permission::INVENTORY_READ, filter)
    }

    /// Chronological history of one device, newest first.
    ///
    /// Observers may only look at devices in their warehouse; anything else
    /// reads as not found.
    pub fn device_timeline(
        &self,
        principal: &Principal,
        device_id: DeviceId,
    ) -> Result<Vec<TimelineEvent>, DispatchError> {
        self.scoped_timeline(principal, &Permission::INVENTORY_READ, device_id)
    }

    /// Every audit entry, newest first.
    pub fn audit_log(&self, principal: &Principal) -> Result<Vec<AuditEntry>, DispatchError> {
        self.read(principal, &Permission::AUDIT_READ, |_, audit| {
            audit.list().into_iter().cloned().collect()
        })
    }

    pub fn search_audit_log(
        &self,
        principal: &Principal,
        phrase: &str,
    ) -> Result<Vec<AuditEntry>, DispatchError> {
        self.read(principal, &Permission::AUDIT_READ, |_, audit| {
            audit.search(phrase).into_iter().cloned().collect()
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Export sources
    // ─────────────────────────────────────────────────────────────────────

    /// Whole inventory (unfiltered dashboard) for a spreadsheet export.
    pub fn export_inventory(&self, principal: &Principal) -> Result<Dashboard, DispatchError> {
        self.scoped_dashboard(principal, &Permission::INVENTORY_EXPORT, &DashboardFilter::default())
    }

    /// The dashboard as currently filtered, for a spreadsheet export.
    pub fn export_view(
        &self,
        principal: &Principal,
        filter: &DashboardFilter,
    ) -> Result<Dashboard, DispatchError> {
        self.scoped_dashboard(principal, &Permission::INVENTORY_EXPORT, filter)
    }

    pub fn export_audit_log(&self, principal: &Principal) -> Result<Vec<AuditEntry>, DispatchError> {
        authorize(principal, &Permission::INVENTORY_EXPORT)?;
        self.audit_log(principal)
    }

    pub fn export_timeline(
        &self,
        principal: &Principal,
        device_id: DeviceId,
    ) -> Result<Vec<TimelineEvent>, DispatchError> {
        self.scoped_timeline(principal, &Permission::INVENTORY_EXPORT, device_id)
    }

    fn scoped_dashboard(
        &self,
        principal: &Principal,
        required: &Permission,
        filter: &DashboardFilter,
    ) -> Result<Dashboard, DispatchError> {
        let Some(warehouse) = WarehouseScope::of(principal).pin(filter.warehouse) else {
            authorize(principal, required)?;
            return Ok(Dashboard::default());
        };
        let filter = DashboardFilter {
            warehouse,
            ..filter.clone()
        };
        self.read(principal, required, |ledger, _| ledger.dashboard(&filter))
    }

    fn scoped_timeline(
        &self,
        principal: &Principal,
        required: &Permission,
        device_id: DeviceId,
    ) -> Result<Vec<TimelineEvent>, DispatchError> {
        let scope = WarehouseScope::of(principal);
        let legacy = self.legacy_history;
        self.read(principal, required, |ledger, audit| {
            let visible = ledger.device_record(device_id).is_some_and(|record| match scope {
                WarehouseScope::All => true,
                WarehouseScope::Only(w) => record_warehouse(record) == Some(w),
                WarehouseScope::Nothing => false,
            });
            if !visible {
                return Err(DomainError::not_found("device", device_id));
            }
            build_timeline(ledger, audit, device_id, legacy)
        })?
        .map_err(DispatchError::from)
    }
}

fn record_warehouse(record: &DeviceRecord) -> Option<WarehouseId> {
    match record {
        DeviceRecord::Live(d) => d.warehouse,
        DeviceRecord::Archived(a) => a.warehouse,
    }
}
