//! Pipeline specification.

use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::registry::StageRegistry;
use serde::{Deserialize, Serialize};

/// A named list of stages a pipeline is expected to contain.
///
/// The list only serves validation; stages are wired by document type and
/// run one at a time by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// The pipeline name.
    pub name: String,
    /// Declared stage names.
    #[serde(default)]
    pub stages: Vec<String>,
}

impl PipelineSpec {
    /// Creates a new pipeline specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or whitespace-only.
    pub fn new(name: impl Into<String>) -> Result<Self, PipelineValidationError> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                "Pipeline name cannot be empty or whitespace-only",
            )
            .with_error_info(ContractErrorInfo::new(
                "PIPELINE-EMPTY-NAME",
                "Pipeline name is blank",
            )));
        }

        Ok(Self {
            name,
            stages: Vec::new(),
        })
    }

    /// Sets the declared stages.
    #[must_use]
    pub fn with_stages(mut self, stages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.stages = stages.into_iter().map(Into::into).collect();
        self
    }

    /// Checks that every declared stage is registered.
    ///
    /// # Errors
    ///
    /// Returns an error listing every missing stage.
    pub fn validate(&self, registry: &StageRegistry) -> Result<(), PipelineValidationError> {
        let missing: Vec<String> = self
            .stages
            .iter()
            .filter(|name| !registry.contains(name))
            .cloned()
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        Err(PipelineValidationError::new(format!(
            "Pipeline '{}' declares unknown stages: {}",
            self.name,
            missing.join(", ")
        ))
        .with_stages(missing.clone())
        .with_error_info(
            ContractErrorInfo::new("PIPELINE-UNKNOWN-STAGE", "Declared stage is not registered")
                .with_fix_hint("Register the stage with PipelineBuilder::stage or drop it from the order.")
                .with_context_entry("pipeline", self.name.clone())
                .with_context_entry("missing", missing.join(",")),
        ))
    }
}
