//! Stateless job submission.
//!
//! [`Submitter::submit`] performs exactly one backend call and never
//! retries; the caller decides whether to resubmit and hands the
//! returned handle to a tracker.

use std::sync::Arc;

use jobtrack_core::error::ValidationError;
use jobtrack_core::handle::JobHandle;
use jobtrack_core::request::{JobDraft, JobRequest};

use crate::api::{ApiError, JobBackend, SubmitPayload};

/// Shown when the backend rejects a submission without a `detail`.
pub const GENERIC_SUBMIT_FAILURE: &str = "Failed to queue the task. Try again.";

/// The backend rejected the submission or could not be reached.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Non-2xx response.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    /// The request never got an HTTP answer.
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// A 2xx response that carried no usable `task_id`.
    #[error("Backend returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl SubmissionError {
    /// Human-readable message for display.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

impl From<ApiError> for SubmissionError {
    fn from(err: ApiError) -> Self {
        match &err {
            ApiError::Status { status, .. } => Self::Rejected {
                status: *status,
                detail: err
                    .detail()
                    .unwrap_or_else(|| GENERIC_SUBMIT_FAILURE.to_string()),
            },
            ApiError::Request(e) if e.is_decode() => Self::InvalidResponse(e.to_string()),
            ApiError::Request(e) => Self::Unreachable(e.to_string()),
            ApiError::InvalidUrl(_) => Self::Unreachable(err.to_string()),
        }
    }
}

/// Either side of a draft submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Sends job requests to the backend.
#[derive(Clone)]
pub struct Submitter {
    backend: Arc<dyn JobBackend>,
}

impl Submitter {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self { backend }
    }

    /// Submit a validated request and return the backend's job handle.
    pub async fn submit(&self, request: &JobRequest) -> Result<JobHandle, SubmissionError> {
        let payload = SubmitPayload::from(request);

        let response = match self.backend.submit(&payload).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    owner_id = request.owner_id,
                    items = request.items.len(),
                    error = %e,
                    "Job submission failed",
                );
                return Err(e.into());
            }
        };

        let task_id = response.task_id.unwrap_or_default();
        let handle = JobHandle::parse(&task_id).map_err(|_| {
            SubmissionError::InvalidResponse("response carried no task_id".to_string())
        })?;

        tracing::info!(
            owner_id = request.owner_id,
            items = request.items.len(),
            task_id = %handle,
            "Job queued",
        );

        Ok(handle)
    }

    /// Validate raw form input, then submit it.
    ///
    /// An invalid draft fails with [`SubmitError::Validation`] without
    /// touching the network.
    pub async fn submit_draft(&self, draft: &JobDraft) -> Result<JobHandle, SubmitError> {
        let request = draft.validate()?;
        Ok(self.submit(&request).await?)
    }
}
