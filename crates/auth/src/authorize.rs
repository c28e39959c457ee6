use thiserror::Error;

use stockroom_core::WarehouseId;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Check that `principal` holds `required`.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.has(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Which warehouses a principal's reads may cover.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WarehouseScope {
    All,
    Only(WarehouseId),
    /// Observer without an assigned warehouse.
    Nothing,
}

impl WarehouseScope {
    pub fn of(principal: &Principal) -> Self {
        if !principal.role.is_observer() {
            return Self::All;
        }
        match principal.warehouse {
            Some(w) => Self::Only(w),
            None => Self::Nothing,
        }
    }

    /// Resolve a requested warehouse filter against this scope.
    ///
    /// Returns `None` when nothing may be shown; otherwise the filter to use.
    /// A pinned scope overrides whatever the caller asked for.
    pub fn pin(self, requested: Option<WarehouseId>) -> Option<Option<WarehouseId>> {
        match self {
            Self::All => Some(requested),
            Self::Only(w) => Some(Some(w)),
            Self::Nothing => None,
        }
    }
}
