//! Public surface of the beverage dispenser.
//!
//! [`Dispenser`] wires the ingredient registry, profile store, telemetry log,
//! event bus and request gateway together and exposes the operations a front
//! panel (or a test) needs.

pub mod dispenser;
pub mod error;

pub use dispenser::{Dispenser, DispenserBuilder, DispenserBus};
pub use error::DispenserError;

pub use dispenser_engine::{CancelHandle, GatewayStats};
pub use dispenser_infra::{ClockMode, DispenserConfig, JsonFileProfileRepository};
pub use dispenser_profiles::{Composition, InvalidComposition, LoadOutcome, Profile, ProfileError};
pub use dispenser_telemetry::{DispenseEvent, DispenseRecord, IngredientPour};
