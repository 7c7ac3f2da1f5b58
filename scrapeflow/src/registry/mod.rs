//! Stage registration and type-based wiring.
//!
//! Stages are wired by declared document types rather than by name: a
//! fan-out stage with automatic input reads the artifact of the one stage
//! whose output type equals its input type.

mod descriptor;
#[allow(clippy::module_inception)]
mod registry;
mod resolver;

pub use descriptor::{InputProducer, SaveHook, StageDescriptor, StageInput};
pub use registry::StageRegistry;
pub use resolver::{Resolution, TypeResolver};
