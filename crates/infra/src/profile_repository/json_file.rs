use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use dispenser_profiles::{Profile, ProfileDocument, ProfileRepository, RepositoryError};

/// Profiles persisted as one JSON document keyed by profile name:
///
/// ```json
/// {
///     "energize": {
///         "ingredients": { "green_tea": 70, "berry": 20, "vitamin_mix": 10 },
///         "description": "Morning energy boost",
///         "created_at": "2024-05-01T08:00:00Z"
///     }
/// }
/// ```
///
/// Ingredient order inside `ingredients` is preserved. Writes go to a sibling
/// temp file which is then renamed over the target, so a crash mid-write never
/// leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct JsonFileProfileRepository {
    path: PathBuf,
}

impl JsonFileProfileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "profiles.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn encode(document: &ProfileDocument) -> Result<Vec<u8>, RepositoryError> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        document
            .serialize(&mut ser)
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
        buf.push(b'\n');
        Ok(buf)
    }

    fn write_atomically(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

impl ProfileRepository for JsonFileProfileRepository {
    fn load(&self) -> Result<BTreeMap<String, Profile>, RepositoryError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RepositoryError::NotFound(self.path.display().to_string()),
            _ => RepositoryError::Io(format!("{}: {e}", self.path.display())),
        })?;

        let document: ProfileDocument = serde_json::from_str(&raw)
            .map_err(|e| RepositoryError::Corrupt(format!("{}: {e}", self.path.display())))?;

        let loaded_at = Utc::now();
        let profiles: BTreeMap<String, Profile> = document
            .into_iter()
            .map(|(name, entry)| {
                let profile = Profile::from_entry(name.clone(), entry, loaded_at);
                (name, profile)
            })
            .collect();

        debug!(path = %self.path.display(), count = profiles.len(), "profiles read");
        Ok(profiles)
    }

    fn save(&self, profiles: &BTreeMap<String, Profile>) -> Result<(), RepositoryError> {
        let document: ProfileDocument = profiles
            .iter()
            .map(|(name, profile)| (name.clone(), profile.to_entry()))
            .collect();
        let bytes = Self::encode(&document)?;

        self.write_atomically(&bytes)
            .map_err(|e| RepositoryError::Io(format!("{}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), count = profiles.len(), "profiles written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dispenser_profiles::{Composition, default_profiles};

    fn repo_in(dir: &tempfile::TempDir) -> JsonFileProfileRepository {
        JsonFileProfileRepository::new(dir.path().join("drink_profiles.json"))
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(repo_in(&dir).load(), Err(RepositoryError::NotFound(_))));
    }

    #[test]
    fn unparseable_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir);
        fs::write(repo.path(), "{ not json").unwrap();
        assert!(matches!(repo.load(), Err(RepositoryError::Corrupt(_))));
    }

    #[test]
    fn saved_profiles_load_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir);
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let mut profiles = default_profiles(created_at);
        let calm = Profile::new(
            "calm",
            Composition::new()
                .with("water", 50.0)
                .with("green_tea", 30.0)
                .with("berry", 20.0),
            "",
            created_at,
        );
        profiles.insert("calm".to_string(), calm);

        repo.save(&profiles).unwrap();
        let loaded = repo.load().unwrap();

        assert_eq!(loaded, profiles);
        let order: Vec<&str> = loaded["calm"].composition().ingredients().collect();
        assert_eq!(order, ["water", "green_tea", "berry"]);
        assert!(!repo.temp_path().exists());
    }

    #[test]
    fn document_is_keyed_by_name_with_ingredient_maps() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir);
        repo.save(&default_profiles(Utc::now())).unwrap();

        let raw = fs::read_to_string(repo.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["energize"]["ingredients"]["green_tea"], 70.0);
        assert_eq!(value["refresh"]["description"], "Afternoon refreshment");
        assert!(raw.contains("\n    \"energize\""));
    }

    #[test]
    fn entries_without_timestamp_get_load_time() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir);
        fs::write(
            repo.path(),
            r#"{"energize": {"ingredients": {"green_tea": 70, "berry": 20, "vitamin_mix": 10}}}"#,
        )
        .unwrap();

        let before = Utc::now();
        let loaded = repo.load().unwrap();
        let energize = &loaded["energize"];
        assert!(energize.created_at() >= before);
        assert_eq!(energize.description(), "");
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileProfileRepository::new(dir.path().join("state/nested/profiles.json"));
        repo.save(&default_profiles(Utc::now())).unwrap();
        assert_eq!(repo.load().unwrap().len(), 2);
    }
}
