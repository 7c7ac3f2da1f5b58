//! Run lifecycle events.
//!
//! The executor reports what it is doing through an [`EventSink`] handed to
//! it at build time. Event types:
//!
//! | type | when |
//! |------|------|
//! | `stage.started` | a run begins |
//! | `stage.input_resolved` | the input set is known |
//! | `item.failed` | one fan-out record was skipped |
//! | `stage.persisted` | the artifact was written |
//! | `stage.completed` | the run ended with SUCCESS |
//! | `stage.failed` | the run ended with ERROR |

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Event type constants.
pub mod types {
    /// A run begins.
    pub const STAGE_STARTED: &str = "stage.started";
    /// The input set is known.
    pub const STAGE_INPUT_RESOLVED: &str = "stage.input_resolved";
    /// A fan-out record was skipped.
    pub const ITEM_FAILED: &str = "item.failed";
    /// The artifact was written.
    pub const STAGE_PERSISTED: &str = "stage.persisted";
    /// The run ended with SUCCESS.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// The run ended with ERROR.
    pub const STAGE_FAILED: &str = "stage.failed";
}

/// One lifecycle event.
#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    /// Dotted event type, see [`types`].
    pub event_type: &'static str,
    /// Stage being run.
    pub stage: String,
    /// Run the event belongs to.
    pub run_id: Uuid,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Event payload; `null` when there is none.
    pub data: serde_json::Value,
}

impl RunEvent {
    /// Creates an event without payload.
    #[must_use]
    pub fn new(event_type: &'static str, stage: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            event_type,
            stage: stage.into(),
            run_id,
            timestamp: Utc::now(),
            data: serde_json::Value::Null,
        }
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let run_id = Uuid::new_v4();
        let event = RunEvent::new(types::STAGE_PERSISTED, "cities", run_id)
            .with_data(serde_json::json!({"count": 2}));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "stage.persisted");
        assert_eq!(json["stage"], "cities");
        assert_eq!(json["run_id"], run_id.to_string());
        assert_eq!(json["data"]["count"], 2);
    }
}
