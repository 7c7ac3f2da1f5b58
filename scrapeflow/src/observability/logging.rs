//! Subscriber installation and per-stage log files.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Per-stage logging options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Write to a file instead of stderr.
    pub enable_file_logging: bool,
    /// Fixed file name; defaults to `<stage>_<YYYY-MM-DD>.log`.
    pub log_file_name: Option<String>,
    /// Directory holding the log file.
    pub log_directory: PathBuf,
    /// Line format.
    pub format: LogFormat,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            enable_file_logging: false,
            log_file_name: None,
            log_directory: PathBuf::from("logs"),
            format: LogFormat::Text,
        }
    }
}

impl LoggingOptions {
    /// File logging into `directory`.
    #[must_use]
    pub fn file(directory: impl Into<PathBuf>) -> Self {
        Self {
            enable_file_logging: true,
            log_directory: directory.into(),
            ..Self::default()
        }
    }

    /// Sets a fixed file name.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.log_file_name = Some(name.into());
        self
    }

    /// Sets the line format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Log file for `stage` on `date`.
    #[must_use]
    pub fn log_file_path(&self, stage: &str, date: NaiveDate) -> PathBuf {
        let name = self
            .log_file_name
            .clone()
            .unwrap_or_else(|| format!("{stage}_{}.log", date.format("%Y-%m-%d")));
        self.log_directory.join(name)
    }
}

/// Builds the subscriber for a run of `stage`, without installing it.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Lines go to the
/// stage's log file when file logging is enabled, else to stderr.
///
/// # Errors
///
/// Returns an error if the log directory or file cannot be created.
pub fn stage_dispatch(stage: &str, options: &LoggingOptions) -> io::Result<Dispatch> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = if options.enable_file_logging {
        fs::create_dir_all(&options.log_directory)?;
        let path = options.log_file_path(stage, crate::utils::current_date());
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        BoxMakeWriter::new(Mutex::new(file))
    } else {
        BoxMakeWriter::new(io::stderr)
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(!options.enable_file_logging);

    Ok(match options.format {
        LogFormat::Text => Dispatch::new(builder.finish()),
        LogFormat::Json => Dispatch::new(builder.json().finish()),
    })
}

/// Installs the subscriber for `stage` as the process-wide default.
///
/// Returns `Ok(false)`, with a warning, if a global subscriber was already
/// installed. The executor scopes per-stage log files to each run with
/// [`stage_dispatch`] instead.
///
/// # Errors
///
/// Returns an error if the log directory or file cannot be created.
pub fn init_logging(stage: &str, options: &LoggingOptions) -> io::Result<bool> {
    let dispatch = stage_dispatch(stage, options)?;
    let installed = tracing::dispatcher::set_global_default(dispatch).is_ok();

    if installed {
        tracing::debug!(stage = %stage, "Logging initialized");
    } else {
        tracing::warn!(stage = %stage, "A global subscriber is already installed");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_default_log_file_name() {
        let path = LoggingOptions::file("logs").log_file_path("cities", date());
        assert_eq!(path, PathBuf::from("logs/cities_2024-03-09.log"));
    }

    #[test]
    fn test_fixed_log_file_name() {
        let path = LoggingOptions::file("/var/log/scrape")
            .with_file_name("run.log")
            .log_file_path("cities", date());
        assert_eq!(path, PathBuf::from("/var/log/scrape/run.log"));
    }

    #[test]
    fn test_defaults() {
        let options = LoggingOptions::default();
        assert!(!options.enable_file_logging);
        assert_eq!(options.format, LogFormat::Text);
    }

    #[test]
    fn test_init_logging_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let options = LoggingOptions::file(dir.path().join("logs")).with_file_name("stage.log");

        init_logging("cities", &options).unwrap();

        assert!(dir.path().join("logs").join("stage.log").exists());
    }

    #[test]
    fn test_stage_dispatch_writes_to_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = stage_dispatch("first", &LoggingOptions::file(dir.path().join("a"))).unwrap();
        let second = stage_dispatch(
            "second",
            &LoggingOptions::file(dir.path().join("b")).with_format(LogFormat::Json),
        )
        .unwrap();

        tracing::dispatcher::with_default(&first, || tracing::error!("from first"));
        tracing::dispatcher::with_default(&second, || tracing::error!("from second"));

        let read = |sub: &str, stage: &str| {
            let path = LoggingOptions::file(dir.path().join(sub))
                .log_file_path(stage, crate::utils::current_date());
            fs::read_to_string(path).unwrap()
        };
        let a = read("a", "first");
        let b = read("b", "second");
        assert!(a.contains("from first") && !a.contains("from second"));
        assert!(b.contains("from second") && !b.contains("from first"));
        assert!(b.trim_start().starts_with('{'));
    }
}
