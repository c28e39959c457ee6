//! `stockroom-auth`: authorization boundary for ledger callers.
//!
//! Decoupled from transport and storage: callers resolve a [`Principal`] and
//! ask [`authorize`] before touching the ledger.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, WarehouseScope, authorize};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
