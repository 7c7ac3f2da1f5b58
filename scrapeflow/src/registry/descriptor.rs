//! Stage descriptors.

use crate::context::StageContext;
use crate::core::{to_record, Document, DocumentBatch, DocumentType, IntoDocuments, Record};
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::observability::LoggingOptions;
use crate::stages::{FanOutFn, GeneratorFn, StageHandler};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Callback run with the aggregated output before the artifact is written.
pub type SaveHook = Arc<dyn Fn(&DocumentBatch) -> anyhow::Result<()> + Send + Sync>;

/// Callable producing the input records of a stage.
pub type InputProducer = Arc<dyn Fn() -> anyhow::Result<Vec<Record>> + Send + Sync>;

/// Where a fan-out stage gets its input records.
#[derive(Clone, Default)]
pub enum StageInput {
    /// The artifact of the unique stage producing the input type.
    #[default]
    Auto,
    /// An artifact file.
    File(PathBuf),
    /// A callable.
    Producer(InputProducer),
}

impl StageInput {
    /// Returns true for [`StageInput::Auto`].
    #[must_use]
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

impl fmt::Debug for StageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("Auto"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Everything the engine knows about one stage.
#[derive(Clone)]
pub struct StageDescriptor {
    name: String,
    handler: Arc<dyn StageHandler>,
    input: StageInput,
    input_type: Option<DocumentType>,
    output_type: DocumentType,
    save_hook: Option<SaveHook>,
    logging: LoggingOptions,
}

impl fmt::Debug for StageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDescriptor")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("input_type", &self.input_type)
            .field("output_type", &self.output_type)
            .field("save_hook", &self.save_hook.is_some())
            .field("logging", &self.logging)
            .finish_non_exhaustive()
    }
}

impl StageDescriptor {
    /// A generator stage: invoked once with no document.
    ///
    /// ```rust,ignore
    /// let cities = StageDescriptor::generator("cities", |ctx: StageContext| async move {
    ///     ctx.driver().navigate("https://example.com/cities").await?;
    ///     anyhow::Ok(vec![City::new("https://example.com/vancouver")])
    /// });
    /// ```
    pub fn generator<F, Fut, R>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(StageContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: IntoDocuments + Send + 'static,
    {
        Self::from_handler(name, Arc::new(GeneratorFn::new(func)))
    }

    /// A fan-out stage: invoked once per input document of type `I`.
    pub fn fan_out<I, F, Fut, R>(name: impl Into<String>, func: F) -> Self
    where
        I: Document,
        F: Fn(StageContext, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: IntoDocuments + Send + 'static,
    {
        Self::from_handler(name, Arc::new(FanOutFn::new(func)))
    }

    /// A stage over a hand-written handler. Types come from the handler.
    #[must_use]
    pub fn from_handler(name: impl Into<String>, handler: Arc<dyn StageHandler>) -> Self {
        Self {
            name: name.into(),
            input_type: handler.input_type(),
            output_type: handler.output_type(),
            handler,
            input: StageInput::Auto,
            save_hook: None,
            logging: LoggingOptions::default(),
        }
    }

    /// Reads input from an artifact file instead of auto-discovery.
    #[must_use]
    pub fn with_input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = StageInput::File(path.into());
        self
    }

    /// Produces input documents with a callable instead of auto-discovery.
    #[must_use]
    pub fn with_input_producer<T, F>(mut self, producer: F) -> Self
    where
        T: Document,
        F: Fn() -> anyhow::Result<Vec<T>> + Send + Sync + 'static,
    {
        self.input = StageInput::Producer(Arc::new(move || -> anyhow::Result<Vec<Record>> {
            let documents = producer()?;
            Ok(documents.iter().map(to_record).collect::<Result<Vec<_>, _>>()?)
        }));
        self
    }

    /// Runs `hook` with the aggregated output before the artifact write.
    #[must_use]
    pub fn with_save_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DocumentBatch) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.save_hook = Some(Arc::new(hook));
        self
    }

    /// Sets per-stage logging options.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingOptions) -> Self {
        self.logging = logging;
        self
    }

    /// Checks the descriptor on its own.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty name, a name that is not a plain file
    /// stem (it keys the stage's artifact file), or a generator that was given
    /// an explicit input source.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new("Stage name cannot be empty")
                .with_error_info(ContractErrorInfo::new(
                    "STAGE-EMPTY-NAME",
                    "Stage name is empty",
                )));
        }

        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(PipelineValidationError::new(format!(
                "Stage name '{}' cannot be used as an artifact file name",
                self.name
            ))
            .with_stages(vec![self.name.clone()])
            .with_error_info(
                ContractErrorInfo::new("STAGE-INVALID-NAME", "Stage name is a path")
                    .with_fix_hint("Use a name without path separators"),
            ));
        }

        if self.is_generator() && !self.input.is_auto() {
            return Err(PipelineValidationError::new(format!(
                "Generator stage '{}' takes no input document but declares an input source",
                self.name
            ))
            .with_stages(vec![self.name.clone()])
            .with_error_info(
                ContractErrorInfo::new(
                    "STAGE-GENERATOR-INPUT",
                    "Generator stage declares an input source",
                )
                .with_fix_hint("Use a fan-out stage or drop the input source")
                .with_context_entry("stage", self.name.clone()),
            ));
        }

        Ok(())
    }

    /// The stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn StageHandler> {
        &self.handler
    }

    /// The input source.
    #[must_use]
    pub fn input(&self) -> &StageInput {
        &self.input
    }

    /// Declared input type; `None` for generators.
    #[must_use]
    pub fn input_type(&self) -> Option<DocumentType> {
        self.input_type
    }

    /// Declared output type.
    #[must_use]
    pub fn output_type(&self) -> DocumentType {
        self.output_type
    }

    /// The save hook, if any.
    #[must_use]
    pub fn save_hook(&self) -> Option<&SaveHook> {
        self.save_hook.as_ref()
    }

    /// Logging options.
    #[must_use]
    pub fn logging(&self) -> &LoggingOptions {
        &self.logging
    }

    /// Returns true if the stage takes no input document.
    #[must_use]
    pub fn is_generator(&self) -> bool {
        self.input_type.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BaseDocument;

    fn generator() -> StageDescriptor {
        StageDescriptor::generator("seeds", |_ctx: StageContext| async {
            anyhow::Ok(BaseDocument::new("https://a"))
        })
    }

    fn fan_out() -> StageDescriptor {
        StageDescriptor::fan_out("details", |_ctx: StageContext, doc: BaseDocument| async move {
            anyhow::Ok(doc)
        })
    }

    #[test]
    fn test_generator_types() {
        let desc = generator();
        assert!(desc.is_generator());
        assert_eq!(desc.output_type(), DocumentType::of::<BaseDocument>());
        assert!(desc.input().is_auto());
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_fan_out_types() {
        let desc = fan_out();
        assert!(!desc.is_generator());
        assert_eq!(desc.input_type(), Some(DocumentType::of::<BaseDocument>()));
    }

    #[test]
    fn test_generator_with_input_is_rejected() {
        let err = generator().with_input_file("seeds.json").validate().unwrap_err();
        assert_eq!(err.code(), Some("STAGE-GENERATOR-INPUT"));
        assert_eq!(err.stages, vec!["seeds".to_string()]);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let desc = StageDescriptor::from_handler(" ", Arc::clone(generator().handler()));
        assert_eq!(desc.validate().unwrap_err().code(), Some("STAGE-EMPTY-NAME"));
    }

    #[test]
    fn test_path_like_names_are_rejected() {
        for name in ["../escape", "nested/stage", "a\\b", ".."] {
            let desc = StageDescriptor::from_handler(name, Arc::clone(generator().handler()));
            assert_eq!(
                desc.validate().unwrap_err().code(),
                Some("STAGE-INVALID-NAME"),
                "{name}"
            );
        }
        let desc = StageDescriptor::from_handler("city.v2", Arc::clone(generator().handler()));
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_input_producer_encodes_documents() {
        let desc = fan_out().with_input_producer(|| {
            anyhow::Ok(vec![BaseDocument::new("https://a"), BaseDocument::new("https://b")])
        });

        let StageInput::Producer(producer) = desc.input() else {
            panic!("expected a producer input");
        };
        let records = producer().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["link"], "https://b");
    }

    #[test]
    fn test_debug_hides_callables() {
        let desc = fan_out().with_save_hook(|_batch| Ok(()));
        let debug = format!("{desc:?}");
        assert!(debug.contains("details"));
        assert!(debug.contains("save_hook: true"));
    }
}
