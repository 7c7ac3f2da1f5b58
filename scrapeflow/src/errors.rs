//! Error types for the scrapeflow engine.
//!
//! Stage-level failures are fatal to a run but never escape it: the executor
//! turns them into an [`ExecutionResult`](crate::core::ExecutionResult) with an
//! [`ErrorKind`]. Item-level failures are recovered inside the fan-out loop.

use crate::persistence::PersistenceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The main error type for scrapeflow operations.
#[derive(Debug, Error)]
pub enum ScrapeflowError {
    /// The requested or declared stage is not registered.
    #[error("Unknown stage '{stage}'")]
    UnknownStage {
        /// The stage name that was looked up.
        stage: String,
    },

    /// No registered stage produces the document type a consumer needs.
    #[error("No stage produces documents of type '{document_type}' (needed by '{consumer}')")]
    NoProducerFound {
        /// The consumer's declared input type.
        document_type: String,
        /// The consumer stage.
        consumer: String,
    },

    /// More than one registered stage produces the needed document type.
    #[error(
        "Ambiguous producer for type '{document_type}' (needed by '{consumer}'): {}",
        producers.join(", ")
    )]
    AmbiguousProducer {
        /// The consumer's declared input type.
        document_type: String,
        /// The consumer stage.
        consumer: String,
        /// Every stage declaring that output type.
        producers: Vec<String>,
    },

    /// A handler produced output that violates its declared document type.
    #[error("Stage '{stage}' produced '{found}' but declares '{expected}'")]
    TypeMismatch {
        /// The offending stage.
        stage: String,
        /// The declared output type.
        expected: String,
        /// What the handler actually returned.
        found: String,
    },

    /// The shared driver resource could not be acquired.
    #[error("Resource error: {0}")]
    Resource(String),

    /// A single input record failed. Always recovered at the item boundary.
    #[error("Stage '{stage}' failed on item {item}: {message}")]
    ItemProcessing {
        /// The stage being run.
        stage: String,
        /// Identity of the offending record.
        item: String,
        /// Failure description.
        message: String,
    },

    /// An input producer callable failed.
    #[error("Input for stage '{stage}' could not be produced: {message}")]
    Input {
        /// The stage being run.
        stage: String,
        /// Failure description.
        message: String,
    },

    /// A generator handler returned an error or panicked.
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed {
        /// The stage being run.
        stage: String,
        /// Failure description.
        message: String,
    },

    /// Reading or writing an artifact failed.
    #[error("{0}")]
    Persistence(#[from] PersistenceError),

    /// Pipeline declaration was invalid.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),
}

impl ScrapeflowError {
    /// Creates an unknown stage error.
    #[must_use]
    pub fn unknown_stage(stage: impl Into<String>) -> Self {
        Self::UnknownStage {
            stage: stage.into(),
        }
    }

    /// Creates a resource error.
    #[must_use]
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource(message.into())
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownStage { .. } => ErrorKind::UnknownStage,
            Self::NoProducerFound { .. } => ErrorKind::NoProducerFound,
            Self::AmbiguousProducer { .. } => ErrorKind::AmbiguousProducer,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::Resource(_) => ErrorKind::ResourceError,
            Self::ItemProcessing { .. } => ErrorKind::ItemProcessingError,
            Self::Input { .. } => ErrorKind::InputError,
            Self::StageFailed { .. } => ErrorKind::StageFailed,
            Self::Persistence(_) => ErrorKind::PersistenceError,
            Self::Validation(_) => ErrorKind::ValidationError,
        }
    }

    /// Returns true if this error ends the run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ItemProcessing { .. })
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map.insert("fatal".to_string(), serde_json::json!(self.is_fatal()));
        map
    }
}

/// Error taxonomy carried on a run result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Stage absent from the registry.
    UnknownStage,
    /// Auto-discovery found no producer.
    NoProducerFound,
    /// Auto-discovery found several producers.
    AmbiguousProducer,
    /// Handler output violates the declared type.
    TypeMismatch,
    /// Shared resource failed to open.
    ResourceError,
    /// Per-item failure (recovered).
    ItemProcessingError,
    /// Input producer failed.
    InputError,
    /// Generator handler failed.
    StageFailed,
    /// Artifact read/write failed.
    PersistenceError,
    /// Pipeline declaration invalid.
    ValidationError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnknownStage => "unknown_stage",
            Self::NoProducerFound => "no_producer_found",
            Self::AmbiguousProducer => "ambiguous_producer",
            Self::TypeMismatch => "type_mismatch",
            Self::ResourceError => "resource_error",
            Self::ItemProcessingError => "item_processing_error",
            Self::InputError => "input_error",
            Self::StageFailed => "stage_failed",
            Self::PersistenceError => "persistence_error",
            Self::ValidationError => "validation_error",
        };
        f.write_str(name)
    }
}

/// Metadata about a declaration error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "PIPELINE-UNKNOWN-STAGE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a pipeline declaration is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ScrapeflowError::unknown_stage("x").kind(),
            ErrorKind::UnknownStage
        );
        assert_eq!(
            ScrapeflowError::resource("no browser").kind(),
            ErrorKind::ResourceError
        );
    }

    #[test]
    fn test_only_item_errors_are_recovered() {
        let item = ScrapeflowError::ItemProcessing {
            stage: "listing".to_string(),
            item: "https://a".to_string(),
            message: "boom".to_string(),
        };
        assert!(!item.is_fatal());
        assert!(ScrapeflowError::unknown_stage("x").is_fatal());
    }

    #[test]
    fn test_ambiguous_producer_message_lists_producers() {
        let err = ScrapeflowError::AmbiguousProducer {
            document_type: "City".to_string(),
            consumer: "listing".to_string(),
            producers: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn test_error_kind_serialize() {
        let json = serde_json::to_string(&ErrorKind::NoProducerFound).unwrap();
        assert_eq!(json, r#""no_producer_found""#);
        assert_eq!(ErrorKind::NoProducerFound.to_string(), "no_producer_found");
    }

    #[test]
    fn test_validation_error_code() {
        let err = PipelineValidationError::new("bad")
            .with_stages(vec!["a".to_string()])
            .with_error_info(ContractErrorInfo::new("PIPELINE-EMPTY", "empty").with_fix_hint("add"));

        assert_eq!(err.code(), Some("PIPELINE-EMPTY"));
        assert_eq!(err.stages, vec!["a".to_string()]);
    }

    #[test]
    fn test_to_dict() {
        let dict = ScrapeflowError::unknown_stage("ghost").to_dict();
        assert_eq!(dict.get("kind").unwrap(), "unknown_stage");
        assert_eq!(dict.get("fatal").unwrap(), true);
    }

    #[test]
    fn test_every_kind_has_an_error() {
        use crate::persistence::PersistenceError;
        use std::collections::HashSet;
        use std::path::PathBuf;

        let errors = vec![
            ScrapeflowError::unknown_stage("x"),
            ScrapeflowError::NoProducerFound {
                document_type: "City".to_string(),
                consumer: "listing".to_string(),
            },
            ScrapeflowError::AmbiguousProducer {
                document_type: "City".to_string(),
                consumer: "listing".to_string(),
                producers: vec!["a".to_string(), "b".to_string()],
            },
            ScrapeflowError::TypeMismatch {
                stage: "s".to_string(),
                expected: "City".to_string(),
                found: "Town".to_string(),
            },
            ScrapeflowError::resource("no browser"),
            ScrapeflowError::ItemProcessing {
                stage: "s".to_string(),
                item: "i".to_string(),
                message: "m".to_string(),
            },
            ScrapeflowError::Input {
                stage: "s".to_string(),
                message: "m".to_string(),
            },
            ScrapeflowError::StageFailed {
                stage: "s".to_string(),
                message: "m".to_string(),
            },
            ScrapeflowError::from(PersistenceError::NotFound {
                path: PathBuf::from("x.json"),
            }),
            ScrapeflowError::from(PipelineValidationError::new("bad")),
        ];

        let kinds: HashSet<String> = errors.iter().map(|e| e.kind().to_string()).collect();
        assert_eq!(kinds.len(), errors.len());
        assert!(kinds.contains("validation_error"));
        assert!(kinds.contains("persistence_error"));
    }
}
