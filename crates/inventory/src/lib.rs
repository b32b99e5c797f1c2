//! Ingredient registry.
//!
//! Holds the fixed set of ingredient definitions and their live levels. The
//! registry is the single source of truth for how much of each ingredient is
//! left; every mutation goes through one of its critical sections.

pub mod ingredient;
pub mod registry;

pub use ingredient::{Ingredient, IngredientCategory};
pub use registry::{IngredientRegistry, LEVEL_EPSILON_ML, RegistryError, RegistryResult};
