//! Append-only event store boundary.
//!
//! Storage-agnostic abstraction for appending to and loading ledger event
//! streams. The in-memory store serves tests and development; the Postgres
//! store is compiled with the `postgres` feature.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
