//! Spreadsheet-style CSV exports of the ledger's read models.
//!
//! Pure serialisation: callers fetch the rows (through the service, which
//! checks `inventory.export`) and pick the destination.

pub mod audit;
pub mod error;
pub mod stock;
pub mod timeline;

pub use audit::write_audit_log;
pub use error::ExportError;
pub use stock::{STOCK_HEADER, write_stock};
pub use timeline::write_timeline;

/// Timestamp format shared by every sheet.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
