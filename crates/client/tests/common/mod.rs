//! In-memory backend used by the submitter and tracker tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use jobtrack_client::api::{ApiError, JobBackend, StatusResponse, SubmitPayload, SubmitResponse};
use jobtrack_core::handle::JobHandle;

/// One scripted answer to a status fetch.
#[derive(Clone)]
pub enum Step {
    Respond(StatusResponse),
    /// Backend answered with a non-2xx status.
    Fail(u16),
    /// Hold the fetch until the gate is notified, then respond.
    Gated(Arc<Notify>, StatusResponse),
}

pub fn state(state: &str) -> Step {
    Step::Respond(StatusResponse::new(state))
}

pub fn success(result: serde_json::Value) -> Step {
    let mut response = StatusResponse::new("SUCCESS");
    response.message = Some("Task completed successfully.".into());
    response.result = Some(result);
    Step::Respond(response)
}

pub fn handle(id: &str) -> JobHandle {
    JobHandle::parse(id).unwrap()
}

/// Backend that replays per-handle scripts and records every call.
///
/// Once a script has one step left, that step repeats forever.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<(String, Instant)>>,
    submissions: Mutex<Vec<SubmitPayload>>,
    submit_status: Mutex<Option<(u16, String)>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, id: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.to_string(), steps.into());
    }

    /// Make every submission fail with this status and body.
    pub fn reject_submissions(&self, status: u16, body: &str) {
        *self.submit_status.lock().unwrap() = Some((status, body.to_string()));
    }

    pub fn calls_for(&self, id: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == id)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn submissions(&self) -> Vec<SubmitPayload> {
        self.submissions.lock().unwrap().clone()
    }

    fn next_step(&self, id: &str) -> Option<Step> {
        let mut scripts = self.scripts.lock().unwrap();
        let steps = scripts.get_mut(id)?;
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn submit(&self, payload: &SubmitPayload) -> Result<SubmitResponse, ApiError> {
        self.submissions.lock().unwrap().push(payload.clone());
        if let Some((status, body)) = self.submit_status.lock().unwrap().clone() {
            return Err(ApiError::Status { status, body });
        }
        Ok(SubmitResponse {
            task_id: Some("abc-123".into()),
            message: None,
        })
    }

    async fn fetch_status(&self, handle: &JobHandle) -> Result<StatusResponse, ApiError> {
        let id = handle.as_str().to_string();
        self.calls.lock().unwrap().push((id.clone(), Instant::now()));

        match self.next_step(&id) {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(status)) => Err(ApiError::Status {
                status,
                body: r#"{"detail":"Service unavailable"}"#.into(),
            }),
            Some(Step::Gated(gate, response)) => {
                gate.notified().await;
                Ok(response)
            }
            None => Err(ApiError::Status {
                status: 404,
                body: r#"{"detail":"Invalid task_id"}"#.into(),
            }),
        }
    }
}
