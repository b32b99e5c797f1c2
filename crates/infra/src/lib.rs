//! Infrastructure layer: profile persistence and configuration.

pub mod config;
pub mod profile_repository;

pub use config::{ClockMode, ConfigError, DispenserConfig};
pub use profile_repository::{InMemoryProfileRepository, JsonFileProfileRepository};
