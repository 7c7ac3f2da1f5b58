//! Pipeline building and execution.
//!
//! A [`Pipeline`] is a frozen registry plus an executor. It runs one stage
//! per call; chaining stages is a matter of running them in order, each
//! reading the artifact its producer wrote.
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new("restaurants")
//!     .stage(StageDescriptor::generator("cities", scrape_cities))?
//!     .stage(StageDescriptor::fan_out("listing", scrape_listing))?
//!     .build()?;
//!
//! let ctx = RunContext::new(driver);
//! pipeline.run(&RunRequest::new("cities"), &ctx).await;
//! pipeline.run(&RunRequest::new("listing"), &ctx).await;
//! ```

mod builder;
mod request;
mod spec;


pub use builder::PipelineBuilder;
pub use request::RunRequest;
pub use spec::PipelineSpec;

use crate::context::RunContext;
use crate::core::RunOutcome;
use crate::errors::ScrapeflowError;
use crate::executor::StageExecutor;
use crate::registry::{StageRegistry, TypeResolver};
use std::sync::Arc;

/// A built, validated pipeline.
#[derive(Debug)]
pub struct Pipeline {
    spec: PipelineSpec,
    registry: Arc<StageRegistry>,
    executor: StageExecutor,
}

impl Pipeline {
    pub(crate) fn from_parts(
        spec: PipelineSpec,
        registry: Arc<StageRegistry>,
        executor: StageExecutor,
    ) -> Self {
        Self {
            spec,
            registry,
            executor,
        }
    }

    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// The validated specification.
    #[must_use]
    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    /// The stage registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<StageRegistry> {
        &self.registry
    }

    /// The executor.
    #[must_use]
    pub fn executor(&self) -> &StageExecutor {
        &self.executor
    }

    /// Runs one stage. Failures are reported on the outcome, never raised.
    pub async fn run(&self, request: &RunRequest, ctx: &RunContext) -> RunOutcome {
        self.executor.run(request, ctx).await
    }

    /// Resolves the producer of every auto-wired fan-out stage.
    ///
    /// Returns `(consumer, producer or resolution error)` in registration
    /// order. Generators and stages with an explicit input are left out.
    #[must_use]
    pub fn wiring(&self) -> Vec<(String, Result<String, ScrapeflowError>)> {
        self.registry
            .descriptors()
            .filter(|descriptor| !descriptor.is_generator() && descriptor.input().is_auto())
            .map(|descriptor| {
                let edge = TypeResolver::resolve(&self.registry, descriptor.name())
                    .map(|resolution| resolution.producer);
                (descriptor.name().to_string(), edge)
            })
            .collect()
    }
}
