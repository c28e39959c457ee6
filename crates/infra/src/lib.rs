//! Infrastructure layer: event storage, command dispatch, the caller-facing
//! service and configuration.

pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod service;

mod integration_tests;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use config::{ConfigError, StockroomConfig};
pub use service::InventoryService;
