use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::profile::Profile;

/// Profile persistence failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Nothing has been persisted yet.
    #[error("profile source not found: {0}")]
    NotFound(String),

    /// The source exists but could not be decoded.
    #[error("profile source is corrupt: {0}")]
    Corrupt(String),

    #[error("profile I/O failed: {0}")]
    Io(String),
}

/// Durable storage for the profile set.
///
/// The store always hands over (and expects back) the complete set; partial
/// updates are not part of the contract.
pub trait ProfileRepository: Send + Sync {
    fn load(&self) -> Result<BTreeMap<String, Profile>, RepositoryError>;

    fn save(&self, profiles: &BTreeMap<String, Profile>) -> Result<(), RepositoryError>;
}

impl<R> ProfileRepository for Arc<R>
where
    R: ProfileRepository + ?Sized,
{
    fn load(&self) -> Result<BTreeMap<String, Profile>, RepositoryError> {
        (**self).load()
    }

    fn save(&self, profiles: &BTreeMap<String, Profile>) -> Result<(), RepositoryError> {
        (**self).save(profiles)
    }
}
