//! Per-run result types.

use super::{DocumentBatch, ExecutionState, RunStatus};
use crate::errors::{ErrorKind, ScrapeflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Item counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStats {
    /// Input records handed to the handler.
    pub total: usize,
    /// Records skipped after a failure.
    pub failed: usize,
}

/// The outcome record of one stage run.
///
/// Built once at the end of the run, never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Stage that was run.
    pub stage: String,
    /// Unique run id.
    pub run_id: Uuid,
    /// Terminal status.
    pub status: RunStatus,
    /// Error description for failed runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error taxonomy for failed runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Item counters.
    pub items: ItemStats,
    /// Number of aggregated documents.
    pub documents: usize,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(
        stage: impl Into<String>,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        items: ItemStats,
        documents: usize,
    ) -> Self {
        Self {
            stage: stage.into(),
            run_id,
            status: RunStatus::Success,
            message: None,
            error_kind: None,
            items,
            documents,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Creates a failed result from the fatal error that ended the run.
    #[must_use]
    pub fn error(
        stage: impl Into<String>,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        error: &ScrapeflowError,
        items: ItemStats,
        documents: usize,
    ) -> Self {
        Self {
            stage: stage.into(),
            run_id,
            status: RunStatus::Error,
            message: Some(error.to_string()),
            error_kind: Some(error.kind()),
            items,
            documents,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Run duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Everything a stage run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The aggregated, deduplicated output.
    pub documents: DocumentBatch,
    /// Terminal status.
    pub result: ExecutionResult,
    /// Where the artifact was written, if it was.
    pub artifact: Option<PathBuf>,
    /// Executor states in the order they were entered.
    pub states: Vec<ExecutionState>,
}

impl RunOutcome {
    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// Returns the error kind of a failed run.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.error_kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let started = Utc::now();
        let result = ExecutionResult::success(
            "cities",
            Uuid::new_v4(),
            started,
            ItemStats { total: 3, failed: 1 },
            2,
        );

        assert!(result.is_success());
        assert!(result.message.is_none());
        assert_eq!(result.items.failed, 1);
        assert!(result.duration_ms() >= 0);
    }

    #[test]
    fn test_error_result_carries_kind() {
        let err = ScrapeflowError::unknown_stage("ghost");
        let result = ExecutionResult::error(
            "ghost",
            Uuid::new_v4(),
            Utc::now(),
            &err,
            ItemStats::default(),
            0,
        );

        assert_eq!(result.status, RunStatus::Error);
        assert_eq!(result.error_kind, Some(ErrorKind::UnknownStage));
        assert!(result.message.unwrap().contains("ghost"));
    }

    #[test]
    fn test_result_serialization() {
        let result = ExecutionResult::success("s", Uuid::new_v4(), Utc::now(), ItemStats::default(), 0);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "SUCCESS");
        assert!(json.get("message").is_none());
    }
}
