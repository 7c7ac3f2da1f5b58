//! Run status and executor state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of a stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// The run completed; individual items may still have been skipped.
    Success,
    /// A stage-level error ended the run.
    Error,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl RunStatus {
    /// Returns true for [`RunStatus::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// States of the stage executor.
///
/// `Idle → ResolvingInput → Running → Aggregating → Persisting → Cleanup → Done`.
/// A fatal error jumps straight to `Persisting`; `Cleanup` and `Done` are
/// always reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Nothing started yet.
    #[default]
    Idle,
    /// Working out the input set.
    ResolvingInput,
    /// Invoking the handler.
    Running,
    /// Folding outputs into the deduplicated collection.
    Aggregating,
    /// Save hook and artifact write.
    Persisting,
    /// Releasing the driver and interceptor.
    Cleanup,
    /// Terminal.
    Done,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ResolvingInput => write!(f, "resolving_input"),
            Self::Running => write!(f, "running"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Persisting => write!(f, "persisting"),
            Self::Cleanup => write!(f, "cleanup"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl ExecutionState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Success.to_string(), "SUCCESS");
        assert_eq!(RunStatus::Error.to_string(), "ERROR");
        assert!(RunStatus::Success.is_success());
        assert!(!RunStatus::Error.is_success());
    }

    #[test]
    fn test_run_status_serialize() {
        let json = serde_json::to_string(&RunStatus::Error).unwrap();
        assert_eq!(json, r#""ERROR""#);

        let deserialized: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, RunStatus::Error);
    }

    #[test]
    fn test_execution_state() {
        assert_eq!(ExecutionState::default(), ExecutionState::Idle);
        assert_eq!(ExecutionState::ResolvingInput.to_string(), "resolving_input");
        assert!(ExecutionState::Done.is_terminal());
        assert!(!ExecutionState::Cleanup.is_terminal());
    }
}
