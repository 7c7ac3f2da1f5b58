//! Pipeline builder with validation.

use super::{Pipeline, PipelineSpec};
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::EventSink;
use crate::executor::{PolitenessDelay, StageExecutor};
use crate::persistence::{ArtifactStore, JsonArtifactStore};
use crate::registry::{StageDescriptor, StageRegistry};
use std::sync::Arc;

/// Builder for creating validated pipelines.
pub struct PipelineBuilder {
    name: String,
    registry: StageRegistry,
    order: Option<Vec<String>>,
    store: Option<Arc<dyn ArtifactStore>>,
    delay: Option<PolitenessDelay>,
    events: Option<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.registry.all())
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: StageRegistry::new(),
            order: None,
            store: None,
            delay: None,
            events: None,
        }
    }

    /// Registers a stage.
    ///
    /// A second stage under an existing name is ignored with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is invalid on its own.
    pub fn stage(mut self, descriptor: StageDescriptor) -> Result<Self, PipelineValidationError> {
        self.registry.register(descriptor)?;
        Ok(self)
    }

    /// Declares the expected stage names, checked at [`build`](Self::build).
    #[must_use]
    pub fn order(mut self, stages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.order = Some(stages.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the artifact store. Defaults to JSON files under `output/`.
    #[must_use]
    pub fn artifact_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fixes the politeness delay instead of deriving it from the run config.
    #[must_use]
    pub fn politeness(mut self, delay: PolitenessDelay) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Number of registered stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.registry.len()
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, no stage is registered, or the
    /// declared order names an unregistered stage.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        let Self {
            name,
            registry,
            order,
            store,
            delay,
            events,
        } = self;

        if registry.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Pipeline '{name}' has no stages"
            ))
            .with_error_info(
                ContractErrorInfo::new("PIPELINE-EMPTY", "Pipeline must contain at least one stage")
                    .with_fix_hint("Register stages with PipelineBuilder::stage before building."),
            ));
        }

        let stages = order.unwrap_or_else(|| registry.all().into_iter().map(str::to_string).collect());
        let spec = PipelineSpec::new(name)?.with_stages(stages);
        spec.validate(&registry)?;

        let registry = Arc::new(registry);
        let store = store
            .unwrap_or_else(|| Arc::new(JsonArtifactStore::default_output()) as Arc<dyn ArtifactStore>);
        let mut executor = StageExecutor::new(Arc::clone(&registry), store);
        if let Some(delay) = delay {
            executor = executor.with_politeness(delay);
        }
        if let Some(events) = events {
            executor = executor.with_event_sink(events);
        }

        tracing::debug!(pipeline = %spec.name, stages = ?spec.stages, "Built pipeline");

        Ok(Pipeline::from_parts(spec, registry, executor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StageContext;
    use crate::core::BaseDocument;

    fn seeds() -> StageDescriptor {
        StageDescriptor::generator("seeds", |_ctx: StageContext| async {
            anyhow::Ok(BaseDocument::new("https://example.com"))
        })
    }

    #[test]
    fn test_build_uses_registration_order() {
        let echo = StageDescriptor::fan_out("echo", |_ctx: StageContext, doc: BaseDocument| async move {
            anyhow::Ok(doc)
        });
        let pipeline = PipelineBuilder::new("p")
            .stage(seeds())
            .unwrap()
            .stage(echo)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(pipeline.spec().stages, vec!["seeds".to_string(), "echo".to_string()]);
    }

    #[test]
    fn test_duplicate_stage_is_ignored() {
        let builder = PipelineBuilder::new("p")
            .stage(seeds())
            .unwrap()
            .stage(seeds())
            .unwrap();
        assert_eq!(builder.stage_count(), 1);
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        let err = PipelineBuilder::new("p").build().unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-EMPTY"));
    }

    #[test]
    fn test_order_must_name_registered_stages() {
        let err = PipelineBuilder::new("p")
            .stage(seeds())
            .unwrap()
            .order(["seeds", "details"])
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-UNKNOWN-STAGE"));
        assert_eq!(err.stages, vec!["details".to_string()]);
    }

    #[test]
    fn test_invalid_descriptor_rejected() {
        let err = PipelineBuilder::new("p")
            .stage(seeds().with_input_file("cities.json"))
            .unwrap_err();
        assert_eq!(err.code(), Some("STAGE-GENERATOR-INPUT"));
    }
}
