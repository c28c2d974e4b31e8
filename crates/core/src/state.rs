//! Backend job state mapping table.
//!
//! The backend reports state as a free-form string. Known values map to
//! dedicated variants; anything else is kept verbatim in
//! [`JobState::Unknown`] so it can still be displayed.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const STATE_PENDING: &str = "PENDING";
pub const STATE_QUEUED: &str = "QUEUED";
pub const STATE_STARTED: &str = "STARTED";
pub const STATE_SUCCESS: &str = "SUCCESS";
pub const STATE_FAILURE: &str = "FAILURE";

/// Lifecycle state of a job as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    /// Waiting in the broker, not yet accepted.
    Pending,
    /// Accepted, awaiting a worker.
    Queued,
    /// A worker is processing the job.
    Started,
    /// Terminal; a result is available.
    Success,
    /// Terminal; an error is available.
    Failure,
    /// A state string outside the known set.
    Unknown(String),
}

/// Human-facing label and description for a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatePresentation {
    pub label: String,
    pub description: Option<String>,
}

impl JobState {
    /// Map a raw backend state string. Never fails.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            STATE_PENDING => Self::Pending,
            STATE_QUEUED => Self::Queued,
            STATE_STARTED => Self::Started,
            STATE_SUCCESS => Self::Success,
            STATE_FAILURE => Self::Failure,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire string for this state.
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Pending => STATE_PENDING,
            Self::Queued => STATE_QUEUED,
            Self::Started => STATE_STARTED,
            Self::Success => STATE_SUCCESS,
            Self::Failure => STATE_FAILURE,
            Self::Unknown(raw) => raw,
        }
    }

    /// `SUCCESS` and `FAILURE` are terminal; no further changes occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Label and description for display.
    ///
    /// Unknown states use the raw value as label and fall back to the
    /// snapshot's `message` for the description.
    pub fn presentation(&self, message: Option<&str>) -> StatePresentation {
        let (label, description) = match self {
            Self::Pending => ("Pending", "Waiting in the broker queue"),
            Self::Queued => ("Queued", "Accepted by the gateway"),
            Self::Started => ("Processing", "Worker is crunching data"),
            Self::Success => ("Completed", "Result stored by the backend"),
            Self::Failure => ("Failed", "See error details below"),
            Self::Unknown(raw) => {
                return StatePresentation {
                    label: raw.clone(),
                    description: message.map(str::to_string),
                }
            }
        };
        StatePresentation {
            label: label.to_string(),
            description: Some(description.to_string()),
        }
    }
}

impl From<String> for JobState {
    fn from(raw: String) -> Self {
        Self::from_wire(&raw)
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_wire().to_string()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
