use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockroom_core::{DeviceId, LoanId};

/// Temporary custody of a device by a client.
///
/// A loan is an overlay: the device stays in its warehouse while on loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub device_id: DeviceId,
    pub client_name: String,
    pub ticket_number: String,
    /// Set at checkout, never changed.
    pub loaned_on: NaiveDate,
}
