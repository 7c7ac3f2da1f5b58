//! Logging setup.
//!
//! Every module logs through `tracing`. [`init_logging`] installs a global
//! subscriber writing to stderr. A stage with file logging enabled on its
//! descriptor gets its own [`stage_dispatch`] for the length of each run, so
//! its lines land in its dated log file.

mod logging;

pub use logging::{init_logging, stage_dispatch, LogFormat, LoggingOptions};
