use serde::{Deserialize, Serialize};

use stockroom_core::{Actor, WarehouseId};

use crate::{Permission, Role};

/// A fully resolved caller.
///
/// `warehouse` only matters for observers: it is the single warehouse their
/// reads are pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub actor: Actor,
    pub role: Role,
    pub permissions: Vec<Permission>,
    pub warehouse: Option<WarehouseId>,
}

impl Principal {
    /// Principal with the permissions its role grants.
    pub fn new(actor: Actor, role: Role, warehouse: Option<WarehouseId>) -> Self {
        let permissions = role.permissions();
        Self {
            actor,
            role,
            permissions,
            warehouse,
        }
    }

    pub fn operator(actor: Actor) -> Self {
        Self::new(actor, Role::OPERATOR, None)
    }

    pub fn observer(actor: Actor, warehouse: Option<WarehouseId>) -> Self {
        Self::new(actor, Role::OBSERVER, warehouse)
    }

    pub fn has(&self, required: &Permission) -> bool {
        self.permissions.iter().any(|p| p.grants(required))
    }
}
