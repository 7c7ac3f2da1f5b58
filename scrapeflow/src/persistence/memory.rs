//! In-memory artifacts for tests and dry runs.

use super::{artifact_file_name, ArtifactStore, PersistenceError};
use crate::core::Record;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Path-keyed artifact map.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    root: PathBuf,
    artifacts: RwLock<HashMap<PathBuf, Vec<Record>>>,
}

impl InMemoryArtifactStore {
    /// Creates an empty store with a virtual root of `output`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("output"),
            artifacts: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds the artifact of `stage`.
    pub fn insert(&self, stage: &str, records: Vec<Record>) -> PathBuf {
        let path = self.artifact_path(stage);
        self.artifacts.write().insert(path.clone(), records);
        path
    }

    /// Stores records under an arbitrary path.
    pub fn insert_at(&self, path: impl Into<PathBuf>, records: Vec<Record>) {
        self.artifacts.write().insert(path.into(), records);
    }

    /// Records stored for `stage`, if any.
    #[must_use]
    pub fn artifact(&self, stage: &str) -> Option<Vec<Record>> {
        self.artifacts.read().get(&self.artifact_path(stage)).cloned()
    }

    /// Returns true if `stage` has an artifact.
    #[must_use]
    pub fn contains(&self, stage: &str) -> bool {
        self.artifacts.read().contains_key(&self.artifact_path(stage))
    }

    /// Number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn artifact_path(&self, stage: &str) -> PathBuf {
        self.root.join(artifact_file_name(stage))
    }

    fn write(&self, stage: &str, records: &[Record]) -> Result<PathBuf, PersistenceError> {
        Ok(self.insert(stage, records.to_vec()))
    }

    fn read(&self, source: &Path) -> Result<Vec<Record>, PersistenceError> {
        let artifacts = self.artifacts.read();
        artifacts
            .get(source)
            .or_else(|| artifacts.get(&self.root.join(source)))
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound {
                path: source.to_path_buf(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::url_record;

    #[test]
    fn test_write_and_read() {
        let store = InMemoryArtifactStore::new();
        let path = store.write("cities", &[url_record("https://a")]).unwrap();

        assert_eq!(path, PathBuf::from("output/cities.json"));
        assert_eq!(store.read(&path).unwrap().len(), 1);
        assert_eq!(store.read(Path::new("cities.json")).unwrap().len(), 1);
        assert!(store.contains("cities"));
    }

    #[test]
    fn test_read_missing() {
        let store = InMemoryArtifactStore::new();
        assert!(matches!(
            store.read(Path::new("ghost.json")),
            Err(PersistenceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_insert_at_custom_path() {
        let store = InMemoryArtifactStore::new();
        store.insert_at("seeds.json", vec![url_record("https://a")]);

        assert_eq!(store.read(Path::new("seeds.json")).unwrap().len(), 1);
        assert_eq!(store.len(), 1);
    }
}
