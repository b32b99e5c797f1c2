use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use dispenser_profiles::{Profile, ProfileRepository, RepositoryError};

/// In-memory profile repository.
///
/// Intended for tests/dev. Starts empty, so the first `load` reports
/// `NotFound` and the store falls back to its seed profiles.
#[derive(Debug, Default)]
pub struct InMemoryProfileRepository {
    saved: RwLock<Option<BTreeMap<String, Profile>>>,
    saves: AtomicUsize,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository that already holds `profiles`.
    pub fn with_profiles(profiles: BTreeMap<String, Profile>) -> Self {
        Self {
            saved: RwLock::new(Some(profiles)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ProfileRepository for InMemoryProfileRepository {
    fn load(&self) -> Result<BTreeMap<String, Profile>, RepositoryError> {
        let saved = self
            .saved
            .read()
            .map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        saved
            .clone()
            .ok_or_else(|| RepositoryError::NotFound("memory".to_string()))
    }

    fn save(&self, profiles: &BTreeMap<String, Profile>) -> Result<(), RepositoryError> {
        let mut saved = self
            .saved
            .write()
            .map_err(|_| RepositoryError::Io("lock poisoned".to_string()))?;
        *saved = Some(profiles.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
