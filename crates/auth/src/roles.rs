use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier used for RBAC.
///
/// Two roles are built in: `operator` may read, mutate, export and browse the audit log; `observer`
/// may only read, and only within an assigned warehouse. Unknown roles carry
/// no permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const OPERATOR: Role = Role(Cow::Borrowed("operator"));
    pub const OBSERVER: Role = Role(Cow::Borrowed("observer"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_observer(&self) -> bool {
        *self == Self::OBSERVER
    }

    /// Permissions granted by this role.
    pub fn permissions(&self) -> Vec<Permission> {
        match self.as_str() {
            "operator" => vec![
                Permission::INVENTORY_READ,
                Permission::INVENTORY_WRITE,
                Permission::INVENTORY_EXPORT,
                Permission::AUDIT_READ,
            ],
            "observer" => vec![Permission::INVENTORY_READ],
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
