use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DeviceId, TransferId, UserId, WarehouseId};

/// A warehouse-to-warehouse relocation of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub device_id: DeviceId,
    /// `None` when the device had no warehouse before the move.
    pub source: Option<WarehouseId>,
    pub destination: WarehouseId,
    pub moved_at: DateTime<Utc>,
    /// `None` for system-initiated moves.
    pub actor: Option<UserId>,
}

impl Transfer {
    pub fn touches(&self, warehouse: WarehouseId) -> bool {
        self.source == Some(warehouse) || self.destination == warehouse
    }
}
