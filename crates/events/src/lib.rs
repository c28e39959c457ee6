//! Domain events: the append-only facts every mutation is recorded as.

pub mod envelope;
pub mod event;
pub mod handler;
pub mod projection;
pub mod runner;

pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use projection::Projection;
pub use runner::{ProjectionCursor, ProjectionError, ProjectionRunner};
