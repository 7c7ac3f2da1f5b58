//! On-disk JSON artifacts.

use super::{artifact_file_name, parse_artifact, ArtifactStore, PersistenceError};
use crate::core::Record;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores `<root>/<stage>.json` files as pretty-printed arrays.
#[derive(Debug, Clone)]
pub struct JsonArtifactStore {
    root: PathBuf,
}

impl JsonArtifactStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `./output`.
    #[must_use]
    pub fn default_output() -> Self {
        Self::new("output")
    }

    /// The artifact directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, source: &Path) -> PathBuf {
        if source.is_absolute() || source.starts_with(&self.root) {
            source.to_path_buf()
        } else {
            self.root.join(source)
        }
    }
}

impl ArtifactStore for JsonArtifactStore {
    fn artifact_path(&self, stage: &str) -> PathBuf {
        self.root.join(artifact_file_name(stage))
    }

    fn write(&self, stage: &str, records: &[Record]) -> Result<PathBuf, PersistenceError> {
        let path = self.artifact_path(stage);

        fs::create_dir_all(&self.root).map_err(|source| PersistenceError::Io {
            path: self.root.clone(),
            source,
        })?;

        let content =
            serde_json::to_string_pretty(records).map_err(|source| PersistenceError::Encode {
                stage: stage.to_string(),
                source,
            })?;

        fs::write(&path, content).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(stage = %stage, path = %path.display(), count = records.len(), "Wrote artifact");
        Ok(path)
    }

    fn read(&self, source: &Path) -> Result<Vec<Record>, PersistenceError> {
        let path = self.resolve(source);
        let content = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                PersistenceError::NotFound { path: path.clone() }
            } else {
                PersistenceError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        parse_artifact(&path, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::url_record;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonArtifactStore::new(dir.path().join("out"));

        let mut city = url_record("https://example.com/vancouver");
        city.insert("name".to_string(), json!("Vancouver"));
        city.insert("population".to_string(), json!(662_248));
        let records = vec![city, url_record("https://example.com/toronto")];

        let path = store.write("cities", &records).unwrap();
        assert_eq!(path, dir.path().join("out").join("cities.json"));
        assert_eq!(store.read(&path).unwrap(), records);
    }

    #[test]
    fn test_relative_source_resolves_against_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonArtifactStore::new(dir.path());
        store.write("cities", &[url_record("https://a")]).unwrap();

        let records = store.read(Path::new("cities.json")).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_write_replaces_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonArtifactStore::new(dir.path());

        store
            .write("s", &[url_record("https://a"), url_record("https://b")])
            .unwrap();
        let path = store.write("s", &[]).unwrap();

        assert!(store.read(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonArtifactStore::new(dir.path());

        let err = store.read(&store.artifact_path("nope")).unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));
    }

    #[test]
    fn test_malformed_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"["just a string"]"#).unwrap();

        let err = JsonArtifactStore::new(dir.path()).read(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed { .. }));
    }
}
