//! Automatic input discovery by document type.

use super::StageRegistry;
use crate::core::DocumentType;
use crate::errors::{ContractErrorInfo, PipelineValidationError, ScrapeflowError};

/// The producer chosen for a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The consuming stage.
    pub consumer: String,
    /// The unique stage producing the consumer's input type.
    pub producer: String,
    /// The document type linking them.
    pub document_type: DocumentType,
}

/// Finds the unique producer of a consumer's input type.
///
/// Stateless; every call rescans the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeResolver;

impl TypeResolver {
    /// Resolves the producer feeding `consumer`.
    ///
    /// # Errors
    ///
    /// - [`ScrapeflowError::UnknownStage`] if `consumer` is not registered
    /// - [`ScrapeflowError::Validation`] if `consumer` is a generator
    /// - [`ScrapeflowError::NoProducerFound`] if no other stage produces its input type
    /// - [`ScrapeflowError::AmbiguousProducer`] if several do
    pub fn resolve(registry: &StageRegistry, consumer: &str) -> Result<Resolution, ScrapeflowError> {
        let descriptor = registry.get(consumer)?;
        let Some(document_type) = descriptor.input_type() else {
            return Err(PipelineValidationError::new(format!(
                "Stage '{consumer}' is a generator and has no input to resolve"
            ))
            .with_stages(vec![consumer.to_string()])
            .with_error_info(ContractErrorInfo::new(
                "RESOLVE-GENERATOR",
                "Generator stages have no input type",
            ))
            .into());
        };

        let mut producers: Vec<String> = registry
            .producers_of(document_type)
            .map(|producer| producer.name())
            .filter(|name| *name != consumer)
            .map(String::from)
            .collect();

        match producers.len() {
            0 => Err(ScrapeflowError::NoProducerFound {
                document_type: document_type.short_name().to_string(),
                consumer: consumer.to_string(),
            }),
            1 => {
                let producer = producers.remove(0);
                tracing::debug!(
                    consumer = %consumer,
                    producer = %producer,
                    document_type = %document_type,
                    "Resolved input producer"
                );
                Ok(Resolution {
                    consumer: consumer.to_string(),
                    producer,
                    document_type,
                })
            }
            _ => {
                producers.sort();
                Err(ScrapeflowError::AmbiguousProducer {
                    document_type: document_type.short_name().to_string(),
                    consumer: consumer.to_string(),
                    producers,
                })
            }
        }
    }
}
