use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "inventory.read").
/// A special wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// View the dashboard, timelines and the audit log.
    pub const INVENTORY_READ: Permission = Permission::from_static("inventory.read");
    /// Any mutating ledger operation.
    pub const INVENTORY_WRITE: Permission = Permission::from_static("inventory.write");
    /// Spreadsheet exports.
    pub const INVENTORY_EXPORT: Permission = Permission::from_static("inventory.export");
    /// Browse and search the audit log.
    pub const AUDIT_READ: Permission = Permission::from_static("audit.read");
    pub const WILDCARD: Permission = Permission::from_static("*");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// Whether holding `self` satisfies a check for `required`.
    pub fn grants(&self, required: &Permission) -> bool {
        self.is_wildcard() || self == required
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_grants_any_permission() {
        assert!(Permission::WILDCARD.grants(&Permission::INVENTORY_WRITE));
        assert!(Permission::new("inventory.read").grants(&Permission::INVENTORY_READ));
        assert!(!Permission::INVENTORY_READ.grants(&Permission::INVENTORY_WRITE));
    }

    #[test]
    fn serializes_as_a_bare_string() {
        let json = serde_json::to_string(&Permission::INVENTORY_EXPORT).unwrap();
        assert_eq!(json, "\"inventory.export\"");
    }
}
