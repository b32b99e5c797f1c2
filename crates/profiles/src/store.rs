use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use dispenser_inventory::IngredientRegistry;

use crate::composition::{Composition, InvalidComposition, validate_composition};
use crate::defaults::default_profiles;
use crate::profile::Profile;
use crate::repository::{ProfileRepository, RepositoryError};

pub type ProfileResult<T> = Result<T, ProfileError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProfileError {
    #[error("invalid profile name: {0}")]
    InvalidName(String),

    #[error("profile already exists: {0}")]
    AlreadyExists(String),

    #[error("profile not found: {0}")]
    NotFound(String),

    #[error("invalid composition: {0}")]
    InvalidComposition(#[from] InvalidComposition),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("profile store lock poisoned")]
    Poisoned,
}

/// What `load` ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Profiles came from the repository. `skipped` lists entries that failed validation.
    Loaded { loaded: usize, skipped: Vec<String> },
    /// The repository had nothing usable; the seed profiles were installed.
    SeededDefaults {
        cause: RepositoryError,
        persisted: bool,
    },
}

/// In-memory profile set backed by a [`ProfileRepository`].
///
/// Every mutation runs under the write lock and persists the full set before
/// the lock is released, so the repository never sees interleaved writes.
#[derive(Debug)]
pub struct ProfileStore<R: ProfileRepository> {
    registry: Arc<IngredientRegistry>,
    repository: R,
    profiles: RwLock<BTreeMap<String, Profile>>,
}

impl<R: ProfileRepository> ProfileStore<R> {
    /// Empty store. Call [`ProfileStore::load`] to populate it.
    pub fn new(registry: Arc<IngredientRegistry>, repository: R) -> Self {
        Self {
            registry,
            repository,
            profiles: RwLock::new(BTreeMap::new()),
        }
    }

    /// Validate a composition against the live ingredient registry.
    pub fn validate(&self, composition: &Composition) -> Result<(), InvalidComposition> {
        validate_composition(composition, |name| self.registry.contains(name))
    }

    pub fn create(
        &self,
        name: &str,
        composition: Composition,
        description: &str,
    ) -> ProfileResult<Profile> {
        let name = validate_name(name)?;
        self.validate(&composition)?;

        let mut profiles = self.profiles.write().map_err(|_| ProfileError::Poisoned)?;
        if profiles.contains_key(name) {
            return Err(ProfileError::AlreadyExists(name.to_string()));
        }

        let profile = Profile::new(name, composition, description, Utc::now());
        profiles.insert(name.to_string(), profile.clone());

        if let Err(e) = self.repository.save(&profiles) {
            profiles.remove(name);
            error!(profile = name, error = %e, "failed to persist new profile");
            return Err(e.into());
        }

        info!(profile = name, ingredients = profile.composition().len(), "profile created");
        Ok(profile)
    }

    /// Replace a profile (delete + create). The old profile survives any failure.
    pub fn update(
        &self,
        name: &str,
        composition: Composition,
        description: &str,
    ) -> ProfileResult<Profile> {
        self.validate(&composition)?;

        let mut profiles = self.profiles.write().map_err(|_| ProfileError::Poisoned)?;
        let previous = profiles
            .remove(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;

        let profile = Profile::new(name, composition, description, Utc::now());
        profiles.insert(name.to_string(), profile.clone());

        if let Err(e) = self.repository.save(&profiles) {
            profiles.insert(name.to_string(), previous);
            error!(profile = name, error = %e, "failed to persist updated profile");
            return Err(e.into());
        }

        info!(profile = name, "profile updated");
        Ok(profile)
    }

    pub fn delete(&self, name: &str) -> ProfileResult<Profile> {
        let mut profiles = self.profiles.write().map_err(|_| ProfileError::Poisoned)?;
        let removed = profiles
            .remove(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;

        if let Err(e) = self.repository.save(&profiles) {
            profiles.insert(name.to_string(), removed);
            error!(profile = name, error = %e, "failed to persist profile deletion");
            return Err(e.into());
        }

        info!(profile = name, "profile deleted");
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> ProfileResult<Profile> {
        let profiles = self.profiles.read().map_err(|_| ProfileError::Poisoned)?;
        profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    /// All profiles, sorted by name.
    pub fn list(&self) -> ProfileResult<Vec<Profile>> {
        let profiles = self.profiles.read().map_err(|_| ProfileError::Poisoned)?;
        Ok(profiles.values().cloned().collect())
    }

    /// Replace the in-memory set with the repository's content.
    ///
    /// Any repository failure falls back to the seed profiles, which are
    /// persisted straight away. The fallback is logged and reported through
    /// [`LoadOutcome::SeededDefaults`].
    pub fn load(&self) -> ProfileResult<LoadOutcome> {
        let mut profiles = self.profiles.write().map_err(|_| ProfileError::Poisoned)?;

        match self.repository.load() {
            Ok(stored) => {
                let mut skipped = Vec::new();
                let valid: BTreeMap<String, Profile> = stored
                    .into_iter()
                    .filter(|(name, profile)| match self.validate(profile.composition()) {
                        Ok(()) => true,
                        Err(reason) => {
                            warn!(profile = %name, %reason, "skipping stored profile");
                            skipped.push(name.clone());
                            false
                        }
                    })
                    .collect();

                let loaded = valid.len();
                *profiles = valid;
                info!(loaded, skipped = skipped.len(), "profiles loaded");
                Ok(LoadOutcome::Loaded { loaded, skipped })
            }
            Err(cause) => {
                warn!(%cause, "profile source unusable, installing default profiles");
                *profiles = default_profiles(Utc::now());

                let persisted = match self.repository.save(&profiles) {
                    Ok(()) => true,
                    Err(e) => {
                        error!(error = %e, "failed to persist default profiles");
                        false
                    }
                };
                Ok(LoadOutcome::SeededDefaults { cause, persisted })
            }
        }
    }

    /// Persist the current set.
    pub fn save(&self) -> ProfileResult<()> {
        let profiles = self.profiles.read().map_err(|_| ProfileError::Poisoned)?;
        self.repository.save(&profiles)?;
        Ok(())
    }
}

fn validate_name(name: &str) -> ProfileResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProfileError::InvalidName("name cannot be empty".to_string()));
    }
    Ok(trimmed)
}
