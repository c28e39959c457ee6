//! Inventory ledger domain (event-sourced).
//!
//! Business rules for devices, parts, loans, transfers and the archive,
//! implemented as deterministic domain logic (no IO, no storage). Read models
//! (audit trail, device history, dashboard) are built from the same state.

pub mod audit_trail;
pub mod catalog;
pub mod command;
pub mod dashboard;
pub mod device;
pub mod event;
pub mod history;
pub mod ledger;
pub mod loan;
pub mod part;
pub mod policy;
pub mod transfer;

pub use audit_trail::AuditTrail;
pub use catalog::{Catalog, DeviceModel, DeviceName, Manufacturer, Warehouse};
pub use command::{LedgerAction, LedgerCommand};
pub use dashboard::{
    ArchiveView, Dashboard, DashboardFilter, DeviceView, LoanView, PartView, SortDirection,
    SortField,
};
pub use device::{ArchivedDevice, Device, DeviceDetails, DeviceRecord};
pub use event::{LedgerChange, LedgerEvent};
pub use history::{TimelineCategory, TimelineEvent, build_timeline};
pub use ledger::{AGGREGATE_TYPE, Ledger};
pub use loan::Loan;
pub use part::{Part, PartDetails};
pub use policy::SameWarehouseMove;
pub use transfer::Transfer;
