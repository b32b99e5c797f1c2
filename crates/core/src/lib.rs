//! Domain building blocks shared by the dispenser crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns)
//! shared by the inventory, profile and dispensing crates.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::DispenseId;
pub use value_object::ValueObject;
