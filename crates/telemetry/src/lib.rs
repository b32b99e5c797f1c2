//! Dispense telemetry: the immutable record of every committed dispense and
//! the append-only log that answers history and level queries.

pub mod event;
pub mod log;
pub mod record;

pub use event::DispenseEvent;
pub use log::{TelemetryError, TelemetryLog};
pub use record::{DispenseRecord, IngredientPour};
