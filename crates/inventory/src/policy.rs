use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::DomainError;

/// What a move to the device's current warehouse does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SameWarehouseMove {
    /// Record a transfer whose source equals its destination.
    #[default]
    Record,
    /// Fail with a validation error.
    Reject,
}

impl FromStr for SameWarehouseMove {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "record" => Ok(SameWarehouseMove::Record),
            "reject" => Ok(SameWarehouseMove::Reject),
            other => Err(DomainError::validation(format!(
                "same-warehouse move policy must be 'record' or 'reject', got '{other}'"
            ))),
        }
    }
}
