//! Test assertions for run outcomes.

use crate::core::RunOutcome;
use crate::errors::ErrorKind;

/// Asserts that the run ended with SUCCESS.
pub fn assert_run_succeeded(outcome: &RunOutcome) {
    assert!(
        outcome.is_success(),
        "Expected success for stage '{}', got {:?}: {}",
        outcome.result.stage,
        outcome.result.error_kind,
        outcome.result.message.as_deref().unwrap_or("")
    );
}

/// Asserts that the run ended with ERROR of the given kind.
pub fn assert_run_failed_with(outcome: &RunOutcome, expected: ErrorKind) {
    assert!(
        !outcome.is_success(),
        "Expected {expected} failure for stage '{}', but it succeeded",
        outcome.result.stage
    );
    assert_eq!(
        outcome.error_kind(),
        Some(expected),
        "Expected error kind {:?}, got {:?}: {}",
        expected,
        outcome.error_kind(),
        outcome.result.message.as_deref().unwrap_or("")
    );
}
