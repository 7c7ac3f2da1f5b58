//! # Scrapeflow
//!
//! A staged web-scraping engine.
//!
//! A scraper is a set of named stages. Each stage declares the document type
//! it produces and, unless it is a generator, the document type it consumes.
//! The engine wires stages by those types, so the `listing` stage that takes
//! `City` documents reads whatever artifact the one `City`-producing stage
//! wrote last.
//!
//! - **Typed stages**: async closures over [`Document`](core::Document) types
//! - **Type-based wiring**: producers are found by output type, never by name
//! - **Item isolation**: one failing item is logged and skipped, the run goes on
//! - **Deduplication**: outputs are merged in first-occurrence order
//! - **Artifacts**: one JSON file per stage, the input of the next stage
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scrapeflow::prelude::*;
//!
//! let pipeline = PipelineBuilder::new("restaurants")
//!     .stage(StageDescriptor::generator("cities", |ctx: StageContext| async move {
//!         ctx.driver().navigate("https://example.com/cities").await?;
//!         anyhow::Ok(vec![City { link: "https://example.com/oslo".into() }])
//!     }))?
//!     .stage(StageDescriptor::fan_out("listing", |ctx: StageContext, city: City| async move {
//!         ctx.driver().navigate(&city.link).await?;
//!         anyhow::Ok(Vec::<Restaurant>::new())
//!     }))?
//!     .build()?;
//!
//! let ctx = RunContext::new(driver);
//! let outcome = pipeline.run(&RunRequest::new("cities"), &ctx).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod browser;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod interceptor;
pub mod observability;
pub mod persistence;
pub mod pipeline;
pub mod registry;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::browser::{Driver, Element, Locator};
    pub use crate::config::{ConfigPatch, ScraperConfig};
    pub use crate::context::{RunContext, StageContext};
    pub use crate::core::{
        BaseDocument, Document, DocumentBatch, DocumentType, ExecutionResult, ExecutionState,
        RunOutcome, RunStatus,
    };
    pub use crate::errors::{ErrorKind, PipelineValidationError, ScrapeflowError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::interceptor::{CapturedRequest, Interceptor, InterceptorExt};
    pub use crate::persistence::{ArtifactStore, JsonArtifactStore};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, RunRequest};
    pub use crate::registry::StageDescriptor;
    pub use crate::utils::compute_id;
}
