use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::LifehubError;

/// Durable keyed store for per-service credentials (tokens, athlete ids,
/// sync cursors). One JSON object per service; writes upsert the given keys
/// and preserve every unrelated entry.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn for_service(service_name: &str) -> Self {
        let path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lifehub")
            .join(service_name)
            .join("credentials.json");
        Self { path }
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read_entries().ok()?.remove(key)
    }

    /// Insert or overwrite the given keys, keeping all other entries.
    pub fn set_many(&self, entries: &[(&str, String)]) -> Result<(), LifehubError> {
        let mut map = self.read_entries()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&map).map_err(|e| LifehubError::Credential {
            path: self.path.clone(),
            detail: format!("Failed to serialize credentials: {e}"),
        })?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    /// A missing file reads as empty; a corrupt file is an error rather than
    /// something to silently overwrite.
    fn read_entries(&self) -> Result<BTreeMap<String, String>, LifehubError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&data).map_err(|e| LifehubError::Credential {
            path: self.path.clone(),
            detail: format!("Invalid JSON: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_path_structure() {
        let store = CredentialStore::for_service("strava");
        let path = store.path().to_string_lossy();
        assert!(path.contains(".lifehub"));
        assert!(path.contains("strava"));
        assert!(path.ends_with("credentials.json"));
    }

    #[test]
    fn different_services_get_different_paths() {
        let a = CredentialStore::for_service("strava");
        let b = CredentialStore::for_service("ynab");
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn get_from_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at_path(dir.path().join("credentials.json"));
        assert!(store.get("access_token").is_none());
    }

    #[test]
    fn set_many_creates_file_and_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at_path(dir.path().join("nested").join("credentials.json"));

        store
            .set_many(&[
                ("access_token", "T".to_string()),
                ("refresh_token", "R".to_string()),
            ])
            .unwrap();

        assert_eq!(store.get("access_token").as_deref(), Some("T"));
        assert_eq!(store.get("refresh_token").as_deref(), Some("R"));
    }

    #[test]
    fn set_many_preserves_unrelated_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at_path(dir.path().join("credentials.json"));

        store
            .set_many(&[
                ("athlete_id", "42".to_string()),
                ("access_token", "old".to_string()),
            ])
            .unwrap();
        store
            .set_many(&[("access_token", "new".to_string())])
            .unwrap();

        assert_eq!(store.get("access_token").as_deref(), Some("new"));
        assert_eq!(store.get("athlete_id").as_deref(), Some("42"));
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let store = CredentialStore::at_path(&path);
        let err = store
            .set_many(&[("access_token", "T".to_string())])
            .unwrap_err();
        assert!(matches!(err, LifehubError::Credential { .. }));
        // The original contents survive.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }
}
