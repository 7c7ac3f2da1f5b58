//! Contexts handed to the executor and to stage handlers.
//!
//! - [`RunContext`]: the collaborators of a run (driver, interceptor, config)
//! - [`StageContext`]: the per-run view a handler receives

mod run;
mod stage;

pub use run::RunContext;
pub use stage::StageContext;
