//! Typed identifiers. Every id is a UUIDv7 so ids sort by creation time.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_ids {
    ($($(#[$meta:meta])* $name:ident;)+) => {$(
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self).map_err(|e| {
                    DomainError::validation(format!("{}: {e}", stringify!($name)))
                })
            }
        }
    )+};
}

uuid_ids! {
    /// A signed-in user.
    UserId;
    /// One event stream. A whole ledger lives in a single stream.
    AggregateId;
    WarehouseId;
    ManufacturerId;
    DeviceModelId;
    /// A canonical device name, shared by devices and parts.
    DeviceNameId;
    /// A device, live or archived.
    ///
    /// An archived device keeps the id it had while it was live; restoring it
    /// allocates a fresh id.
    DeviceId;
    /// A spare-part row.
    PartId;
    LoanId;
    TransferId;
    /// An audit entry. Equal to the id of the event that produced it.
    AuditEntryId;
}
