//! Artifact persistence.
//!
//! Every registered stage owns one artifact: the deduplicated output of its
//! most recent run, keyed by stage name. Artifacts are also the input source
//! of auto-wired consumer stages.

mod json;
mod memory;

pub use json::JsonArtifactStore;
pub use memory::InMemoryArtifactStore;

use crate::core::Record;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading or writing artifacts.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem failure.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// The artifact path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// No artifact exists at the path.
    #[error("Artifact not found: '{}'", path.display())]
    NotFound {
        /// The artifact path.
        path: PathBuf,
    },

    /// The artifact is not a JSON array of flat objects.
    #[error("Malformed artifact '{}': {reason}", path.display())]
    Malformed {
        /// The artifact path.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// Records could not be serialized.
    #[error("Failed to encode artifact for stage '{stage}': {source}")]
    Encode {
        /// The stage being persisted.
        stage: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Storage for stage artifacts.
pub trait ArtifactStore: Send + Sync + fmt::Debug {
    /// Where the artifact of `stage` lives.
    fn artifact_path(&self, stage: &str) -> PathBuf;

    /// Replaces the artifact of `stage` with `records`.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be written.
    fn write(&self, stage: &str, records: &[Record]) -> Result<PathBuf, PersistenceError>;

    /// Reads the records stored at `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact is missing or malformed.
    fn read(&self, source: &Path) -> Result<Vec<Record>, PersistenceError>;
}

fn artifact_file_name(stage: &str) -> String {
    format!("{stage}.json")
}

/// Parses artifact content, requiring an array of objects.
pub(crate) fn parse_artifact(path: &Path, content: &str) -> Result<Vec<Record>, PersistenceError> {
    let malformed = |reason: String| PersistenceError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| malformed(e.to_string()))?;

    let serde_json::Value::Array(items) = value else {
        return Err(malformed(format!(
            "expected an array, got {}",
            crate::core::json_kind(&value)
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            serde_json::Value::Object(record) => Ok(record),
            other => Err(malformed(format!(
                "entry {index} is {}, expected an object",
                crate::core::json_kind(&other)
            ))),
        })
        .collect()
}
