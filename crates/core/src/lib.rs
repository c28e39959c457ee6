//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod actor;
pub mod aggregate;
pub mod error;
pub mod id;

pub use actor::Actor;
pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{
    AggregateId, AuditEntryId, DeviceId, DeviceModelId, DeviceNameId, LoanId, ManufacturerId,
    PartId, TransferId, UserId, WarehouseId,
};
