//! Drink profiles: named recipes expressed as ingredient percentages.
//!
//! This crate owns the validation rules for a composition and the in-memory
//! profile store. Durable storage is delegated to a [`ProfileRepository`]
//! implementation supplied by the caller.

pub mod composition;
pub mod defaults;
pub mod profile;
pub mod repository;
pub mod store;

pub use composition::{Composition, InvalidComposition, PERCENT_EPSILON, validate_composition};
pub use defaults::default_profiles;
pub use profile::{Profile, ProfileDocument, ProfileEntry};
pub use repository::{ProfileRepository, RepositoryError};
pub use store::{LoadOutcome, ProfileError, ProfileResult, ProfileStore};
