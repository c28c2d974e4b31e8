//! REST client for the job-processing backend.
//!
//! Wraps the two job endpoints (submission and status lookup) plus the
//! health probes using [`reqwest`]. The [`JobBackend`] trait is the seam
//! the submitter and tracker depend on, so either can run against an
//! in-memory backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use jobtrack_core::handle::JobHandle;
use jobtrack_core::request::JobRequest;
use jobtrack_core::snapshot::JobSnapshot;
use jobtrack_core::state::JobState;

use crate::config::ClientConfig;

/// Path of the job submission endpoint.
pub const SUBMIT_PATH: &str = "/example/process-data";

/// Path prefix of the job status endpoint; the task id is appended.
pub const STATUS_PATH: &str = "/example/task";

/// Body of `POST /example/process-data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitPayload {
    pub data: SubmitData,
}

/// The `data` object of a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitData {
    pub user_id: i64,
    pub items: Vec<i64>,
    /// Always present on the wire; an absent note is sent as `""`.
    pub note: String,
}

impl From<&JobRequest> for SubmitPayload {
    fn from(request: &JobRequest) -> Self {
        Self {
            data: SubmitData {
                user_id: request.owner_id,
                items: request.items.clone(),
                note: request.note.clone().unwrap_or_default(),
            },
        }
    }
}

/// Response of a successful submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    /// Backend-assigned job identifier.
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /example/task/{task_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub state: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            message: None,
            result: None,
            error: None,
        }
    }

    /// Map the raw response through the state table.
    ///
    /// Empty `message` and `error` strings are treated as absent and a
    /// JSON `null` result as no result.
    pub fn into_snapshot(self, observed_at: jobtrack_core::types::Timestamp) -> JobSnapshot {
        JobSnapshot {
            state: JobState::from_wire(&self.state),
            message: self.message.filter(|m| !m.is_empty()),
            result: self.result.filter(|r| !r.is_null()),
            error: self.error.filter(|e| !e.is_empty()),
            observed_at,
        }
    }
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The configured base URL cannot carry a request path.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ApiError {
    /// The backend's `detail` message, when the error body carries one.
    ///
    /// String details are returned as-is; structured details (e.g.
    /// validation error lists) are rendered as compact JSON.
    pub fn detail(&self) -> Option<String> {
        let Self::Status { body, .. } = self else {
            return None;
        };
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.detail {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            serde_json::Value::Null => None,
            serde_json::Value::String(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// HTTP status code for backend-side errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidUrl(_) => None,
        }
    }
}

/// Backend operations the submitter and tracker depend on.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Queue a job. Exactly one request, no retries.
    async fn submit(&self, payload: &SubmitPayload) -> Result<SubmitResponse, ApiError>;

    /// Fetch the current status of a job.
    async fn fetch_status(&self, handle: &JobHandle) -> Result<StatusResponse, ApiError>;
}

/// Health endpoints exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthComponent {
    /// Liveness of the API process.
    Api,
    Database,
    Broker,
    Workers,
}

impl HealthComponent {
    pub const ALL: [HealthComponent; 4] = [Self::Api, Self::Database, Self::Broker, Self::Workers];

    pub fn path(self) -> &'static str {
        match self {
            Self::Api => "/health",
            Self::Database => "/health/db",
            Self::Broker => "/health/redis",
            Self::Workers => "/health/celery",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Database => "db",
            Self::Broker => "redis",
            Self::Workers => "celery",
        }
    }

    /// Parse a component name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// Outcome of one health probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub component: &'static str,
    pub healthy: bool,
    /// `0` when the request got no HTTP answer.
    pub status_code: u16,
    /// Parsed JSON body, or the raw text wrapped in a JSON string.
    pub body: serde_json::Value,
}

impl HealthReport {
    /// Report for a probe whose request failed outright.
    pub fn unreachable(component: HealthComponent, err: &ApiError) -> Self {
        Self {
            component: component.name(),
            healthy: false,
            status_code: 0,
            body: serde_json::json!({ "detail": err.to_string() }),
        }
    }
}

/// HTTP client for a single backend.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client using the configured base URL and request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, &config.base_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: crate::config::normalize_base_url(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe one health endpoint.
    ///
    /// A non-2xx answer is a successful probe of an unhealthy component;
    /// only a failed request is an error.
    pub async fn health(&self, component: HealthComponent) -> Result<HealthReport, ApiError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, component.path()))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));

        Ok(HealthReport {
            component: component.name(),
            healthy: status.is_success(),
            status_code: status.as_u16(),
            body,
        })
    }

    /// Probe each component in turn. A failed request is reported as an
    /// unhealthy component instead of ending the run.
    pub async fn health_all(&self, components: &[HealthComponent]) -> Vec<HealthReport> {
        let mut reports = Vec::with_capacity(components.len());
        for &component in components {
            let report = match self.health(component).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(component = component.name(), error = %e, "Health probe failed");
                    HealthReport::unreachable(component, &e)
                }
            };
            reports.push(report);
        }
        reports
    }

    // ---- private helpers ----

    /// Status URL for `handle`, with the id percent-encoded as a single
    /// path segment.
    fn status_url(&self, handle: &JobHandle) -> Result<reqwest::Url, ApiError> {
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, STATUS_PATH))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
            .push(handle.as_str());
        Ok(url)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl JobBackend for HttpBackend {
    async fn submit(&self, payload: &SubmitPayload) -> Result<SubmitResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, SUBMIT_PATH))
            .json(payload)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn fetch_status(&self, handle: &JobHandle) -> Result<StatusResponse, ApiError> {
        let response = self
            .client
            .get(self.status_url(handle)?)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}
