//! The stage registry.

use super::StageDescriptor;
use crate::core::DocumentType;
use crate::errors::{PipelineValidationError, ScrapeflowError};
use std::collections::HashMap;

/// Name-keyed stage descriptors.
///
/// Built before any run and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    stages: HashMap<String, StageDescriptor>,
    order: Vec<String>,
}

impl StageRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor.
    ///
    /// Returns `Ok(false)` without replacing anything if the name is taken;
    /// the first registration wins.
    ///
    /// # Errors
    ///
    /// Returns the descriptor's validation error.
    pub fn register(&mut self, descriptor: StageDescriptor) -> Result<bool, PipelineValidationError> {
        descriptor.validate()?;

        let name = descriptor.name().to_string();
        if self.stages.contains_key(&name) {
            tracing::warn!(stage = %name, "Stage already registered, keeping the first registration");
            return Ok(false);
        }

        tracing::debug!(
            stage = %name,
            input_type = ?descriptor.input_type(),
            output_type = %descriptor.output_type(),
            "Registered stage"
        );
        self.order.push(name.clone());
        self.stages.insert(name, descriptor);
        Ok(true)
    }

    /// Checks that `name` is registered.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeflowError::UnknownStage`] otherwise.
    pub fn validate(&self, name: &str) -> Result<(), ScrapeflowError> {
        if self.stages.contains_key(name) {
            Ok(())
        } else {
            Err(ScrapeflowError::unknown_stage(name))
        }
    }

    /// Looks up a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeflowError::UnknownStage`] if `name` is not registered.
    pub fn get(&self, name: &str) -> Result<&StageDescriptor, ScrapeflowError> {
        self.stages
            .get(name)
            .ok_or_else(|| ScrapeflowError::unknown_stage(name))
    }

    /// Every registered name, in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &StageDescriptor> {
        self.order.iter().filter_map(|name| self.stages.get(name))
    }

    /// Stages whose declared output is `doc_type`.
    pub fn producers_of(&self, doc_type: DocumentType) -> impl Iterator<Item = &StageDescriptor> {
        self.descriptors()
            .filter(move |descriptor| descriptor.output_type() == doc_type)
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Number of registered stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StageContext;
    use crate::core::BaseDocument;
    use crate::errors::ErrorKind;

    fn stage(name: &str) -> StageDescriptor {
        StageDescriptor::generator(name, |_ctx: StageContext| async {
            anyhow::Ok(Vec::<BaseDocument>::new())
        })
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = StageRegistry::new();
        assert!(registry.register(stage("cities")).unwrap());

        assert!(registry.contains("cities"));
        assert_eq!(registry.get("cities").unwrap().name(), "cities");
        assert!(registry.validate("cities").is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = StageRegistry::new();
        let first = stage("cities").with_save_hook(|_| Ok(()));

        assert!(registry.register(first).unwrap());
        assert!(!registry.register(stage("cities")).unwrap());

        assert_eq!(registry.len(), 1);
        assert!(registry.get("cities").unwrap().save_hook().is_some());
    }

    #[test]
    fn test_unknown_stage() {
        let registry = StageRegistry::new();
        assert_eq!(
            registry.validate("ghost").unwrap_err().kind(),
            ErrorKind::UnknownStage
        );
        assert!(registry.get("ghost").is_err());
    }

    #[test]
    fn test_all_keeps_registration_order() {
        let mut registry = StageRegistry::new();
        for name in ["b", "a", "c"] {
            registry.register(stage(name)).unwrap();
        }
        assert_eq!(registry.all(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_invalid_descriptor_rejected() {
        let mut registry = StageRegistry::new();
        let result = registry.register(stage("seeds").with_input_file("x.json"));

        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_producers_of() {
        let mut registry = StageRegistry::new();
        registry.register(stage("a")).unwrap();
        registry.register(stage("b")).unwrap();

        let producers: Vec<_> = registry
            .producers_of(DocumentType::of::<BaseDocument>())
            .map(StageDescriptor::name)
            .collect();
        assert_eq!(producers, vec!["a", "b"]);
    }
}
