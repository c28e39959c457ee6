//! Domain error model.

use thiserror::Error;

use crate::DeviceId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only. Storage and concurrency failures are
/// reported by the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced entity is absent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A live device already holds this serial number.
    #[error("serial number already in use: {0}")]
    DuplicateSerial(String),

    /// A quantity argument was zero, negative or out of range.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// A hand-off asked for more units than are in stock.
    #[error("insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity { requested: i64, available: u32 },

    /// The device already has an active loan.
    #[error("device already on loan: {0}")]
    AlreadyLoaned(DeviceId),

    /// A uniquely-named record already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A record cannot be removed while other records reference it.
    #[error("in use: {0}")]
    InUse(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn in_use(msg: impl Into<String>) -> Self {
        Self::InUse(msg.into())
    }
}
