//! Point-in-time view of a job produced by one successful status fetch.

use serde::{Deserialize, Serialize};

use crate::state::JobState;
use crate::types::Timestamp;

/// One successful status observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub state: JobState,
    pub message: Option<String>,
    /// Opaque result payload, present once the job has produced one.
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub observed_at: Timestamp,
}

/// Result record the reference backend stores for a processed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedResult {
    pub task_id: String,
    pub status: String,
    pub processed_items: i64,
    pub result_message: String,
}

impl JobSnapshot {
    pub fn new(state: JobState, observed_at: Timestamp) -> Self {
        Self {
            state,
            message: None,
            result: None,
            error: None,
            observed_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Interpret `result` as a [`ProcessedResult`].
    ///
    /// Returns `None` when there is no result or it has another shape;
    /// the raw value stays available in `result` either way.
    pub fn processed_result(&self) -> Option<ProcessedResult> {
        self.result
            .as_ref()
            .filter(|value| !value.is_null())
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}
