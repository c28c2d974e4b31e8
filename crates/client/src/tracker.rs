//! Job status tracker.
//!
//! [`Tracker`] owns at most one tracking session at a time. A session
//! polls the backend for one [`JobHandle`]: an immediate fetch, then one
//! fetch per interval measured from the end of the previous fetch, until
//! a terminal state is observed or the session is cancelled.
//!
//! All visible state lives in a single [`watch`] channel. Every write is
//! tagged with the session id that produced it and is applied only if
//! that session is still current, so a fetch for a replaced handle can
//! never leak into the new session's state. Applied changes are also
//! broadcast as [`TrackerEvent`]s.
//!
//! Sessions spawn tokio tasks; start them from within a runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use jobtrack_core::handle::JobHandle;
use jobtrack_core::snapshot::JobSnapshot;
use jobtrack_core::state::StatePresentation;
use jobtrack_core::types::Timestamp;

use crate::api::{ApiError, JobBackend};
use crate::backoff::{BackoffConfig, PollSchedule};
use crate::config::ClientConfig;
use crate::events::TrackerEvent;

/// Message surfaced while the backend cannot be reached.
pub const TRANSPORT_ERROR_MESSAGE: &str = "Unable to reach the API for status updates.";

/// Broadcast channel capacity for tracker events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Where the tracker is in its polling lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TrackerPhase {
    /// No handle assigned.
    #[default]
    Idle,
    /// Handle assigned, timer armed.
    Polling,
    /// Terminal state observed, timer stopped.
    Settled,
}

/// A status fetch that failed to produce a snapshot. Non-fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportError {
    pub message: String,
    /// Underlying failure, for logs and debugging.
    pub detail: String,
    /// HTTP status, when the backend answered at all.
    pub status: Option<u16>,
    pub occurred_at: Timestamp,
}

impl TransportError {
    fn from_api(err: &ApiError) -> Self {
        Self {
            message: TRANSPORT_ERROR_MESSAGE.to_string(),
            detail: err.detail().unwrap_or_else(|| err.to_string()),
            status: err.status(),
            occurred_at: Utc::now(),
        }
    }
}

/// Consistent view of the tracked job, replaced atomically on every update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackerState {
    /// Id of the session this state belongs to.
    pub session: u64,
    pub handle: Option<JobHandle>,
    pub phase: TrackerPhase,
    /// Latest good snapshot. Kept across transport failures.
    pub snapshot: Option<JobSnapshot>,
    /// When the last successful fetch resolved.
    pub last_success_at: Option<Timestamp>,
    /// Set by a failed fetch, cleared by the next successful one.
    pub transport_error: Option<TransportError>,
    /// A manual refresh is outstanding.
    pub refreshing: bool,
    /// Number of snapshots applied in this session.
    pub polls: u64,
    /// Sequence number of the newest applied fetch.
    #[serde(skip)]
    applied_seq: u64,
}

impl TrackerState {
    pub fn is_settled(&self) -> bool {
        self.phase == TrackerPhase::Settled
    }

    /// Label and description of the latest known state.
    pub fn presentation(&self) -> Option<StatePresentation> {
        self.snapshot
            .as_ref()
            .map(|s| s.state.presentation(s.message.as_deref()))
    }

    /// The error worth showing: the job's own error first, then the
    /// transport error.
    pub fn error_message(&self) -> Option<&str> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.error.as_deref())
            .or_else(|| self.transport_error.as_ref().map(|e| e.message.as_str()))
    }
}

/// Result of trying to apply a fetch outcome to the shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Snapshot { terminal: bool },
    TransportFailure,
    /// A newer fetch of the same session was already applied.
    Outdated,
    /// The session already settled; only terminal outcomes are taken.
    AfterSettled,
    /// The session is no longer current.
    Inactive,
}

/// State shared between the tracker and its spawned fetch tasks.
struct Shared {
    backend: Arc<dyn JobBackend>,
    state: watch::Sender<TrackerState>,
    events: broadcast::Sender<TrackerEvent>,
    seq: AtomicU64,
    poll_interval: Duration,
    backoff: BackoffConfig,
}

impl Shared {
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn emit(&self, event: TrackerEvent) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.events.send(event);
    }

    async fn fetch(&self, handle: &JobHandle) -> Result<JobSnapshot, TransportError> {
        match self.backend.fetch_status(handle).await {
            Ok(response) => Ok(response.into_snapshot(Utc::now())),
            Err(e) => {
                tracing::warn!(task_id = %handle, error = %e, "Status fetch failed");
                Err(TransportError::from_api(&e))
            }
        }
    }

    /// Apply one fetch outcome if it still belongs to the current session
    /// and is not older than what is displayed.
    ///
    /// Terminal snapshots are always applied. Once settled, nothing but
    /// another terminal snapshot changes the state.
    fn apply(
        &self,
        session: u64,
        handle: &JobHandle,
        seq: u64,
        outcome: Result<JobSnapshot, TransportError>,
        manual: bool,
    ) -> Applied {
        let mut applied = Applied::Inactive;

        self.state.send_if_modified(|state| {
            if state.session != session {
                return false;
            }

            let mut modified = false;
            if manual && state.refreshing {
                state.refreshing = false;
                modified = true;
            }

            // A terminal outcome is final whatever its sequence number.
            let terminal_outcome = matches!(&outcome, Ok(snapshot) if snapshot.is_terminal());
            if state.phase == TrackerPhase::Settled && !terminal_outcome {
                applied = Applied::AfterSettled;
                return modified;
            }
            if seq < state.applied_seq && !terminal_outcome {
                applied = Applied::Outdated;
                return modified;
            }
            state.applied_seq = state.applied_seq.max(seq);

            match outcome {
                Ok(snapshot) => {
                    let terminal = snapshot.is_terminal();
                    state.last_success_at = Some(snapshot.observed_at);
                    state.transport_error = None;
                    state.polls += 1;
                    if terminal {
                        state.phase = TrackerPhase::Settled;
                    }

                    self.emit(TrackerEvent::SnapshotUpdated {
                        session,
                        handle: handle.clone(),
                        seq,
                        snapshot: snapshot.clone(),
                    });
                    if terminal {
                        self.emit(TrackerEvent::Settled {
                            session,
                            handle: handle.clone(),
                            state: snapshot.state.clone(),
                        });
                    }

                    state.snapshot = Some(snapshot);
                    applied = Applied::Snapshot { terminal };
                }
                Err(error) => {
                    self.emit(TrackerEvent::TransportFailed {
                        session,
                        handle: handle.clone(),
                        error: error.clone(),
                    });
                    state.transport_error = Some(error);
                    applied = Applied::TransportFailure;
                }
            }
            true
        });

        applied
    }
}

/// Bookkeeping for the one live session.
struct ActiveSession {
    id: u64,
    handle: JobHandle,
    /// Cancels everything the session spawned.
    cancel: CancellationToken,
    /// Child of `cancel`; stops only the interval timer.
    timer: CancellationToken,
    task: JoinHandle<()>,
}

/// Polls job status for one handle at a time.
///
/// Owned by a single consumer. Replacing or clearing the handle cancels
/// the previous session before anything else happens; dropping the
/// tracker cancels the active session.
pub struct Tracker {
    shared: Arc<Shared>,
    active: Option<ActiveSession>,
    next_session: u64,
}

impl Tracker {
    pub fn new(backend: Arc<dyn JobBackend>, config: &ClientConfig) -> Self {
        let (state, _) = watch::channel(TrackerState::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                backend,
                state,
                events,
                seq: AtomicU64::new(0),
                poll_interval: config.poll_interval,
                backoff: config.backoff.clone(),
            }),
            active: None,
            next_session: 0,
        }
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> TrackerState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that always holds the latest state.
    pub fn watch(&self) -> watch::Receiver<TrackerState> {
        self.shared.state.subscribe()
    }

    /// Subscribe to tracker events.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.shared.events.subscribe()
    }

    /// Handle of the active session, if any.
    pub fn handle(&self) -> Option<&JobHandle> {
        self.active.as_ref().map(|a| &a.handle)
    }

    pub fn phase(&self) -> TrackerPhase {
        self.shared.state.borrow().phase
    }

    /// Begin tracking `handle`, cancelling any previous session first.
    ///
    /// Returns the new session id. The first fetch is issued right away.
    pub fn start_session(&mut self, handle: JobHandle) -> u64 {
        let previous = self.stop_active();

        self.next_session += 1;
        let id = self.next_session;

        let shared = &self.shared;
        shared.state.send_modify(|state| {
            if let Some((prev_id, prev_handle)) = previous {
                shared.emit(TrackerEvent::SessionCancelled {
                    session: prev_id,
                    handle: prev_handle,
                });
            }
            *state = TrackerState {
                session: id,
                handle: Some(handle.clone()),
                phase: TrackerPhase::Polling,
                ..Default::default()
            };
            shared.emit(TrackerEvent::SessionStarted {
                session: id,
                handle: handle.clone(),
            });
        });

        let cancel = CancellationToken::new();
        let timer = cancel.child_token();
        let task = tokio::spawn(run_poll_loop(
            Arc::clone(shared),
            id,
            handle.clone(),
            timer.clone(),
        ));

        tracing::info!(session = id, task_id = %handle, "Tracking session started");

        self.active = Some(ActiveSession {
            id,
            handle,
            cancel,
            timer,
            task,
        });
        id
    }

    /// Clear the handle and return to idle.
    ///
    /// Takes effect immediately: any fetch still in flight for the old
    /// session is discarded when it resolves.
    pub fn cancel_session(&mut self) {
        let Some((prev_id, prev_handle)) = self.stop_active() else {
            return;
        };

        self.next_session += 1;
        let id = self.next_session;

        let shared = &self.shared;
        shared.state.send_modify(|state| {
            *state = TrackerState {
                session: id,
                ..Default::default()
            };
            shared.emit(TrackerEvent::SessionCancelled {
                session: prev_id,
                handle: prev_handle.clone(),
            });
        });

        tracing::info!(session = prev_id, task_id = %prev_handle, "Tracking session cancelled");
    }

    /// Issue one out-of-band fetch for the active handle.
    ///
    /// Does not touch the interval schedule. A terminal result stops the
    /// timer exactly as a scheduled poll would. Returns `false` when no
    /// handle is assigned or a manual refresh is already outstanding.
    pub fn refresh(&self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        let id = active.id;

        let started = self.shared.state.send_if_modified(|state| {
            if state.session != id || state.refreshing {
                return false;
            }
            state.refreshing = true;
            true
        });
        if !started {
            return false;
        }

        let shared = Arc::clone(&self.shared);
        let handle = active.handle.clone();
        let cancel = active.cancel.clone();
        let timer = active.timer.clone();
        let seq = shared.next_seq();

        tracing::debug!(session = id, task_id = %handle, seq, "Manual refresh");

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = shared.fetch(&handle) => outcome,
            };
            let applied = shared.apply(id, &handle, seq, outcome, true);
            if matches!(applied, Applied::Snapshot { terminal: true }) {
                timer.cancel();
            }
        });
        true
    }

    /// Wait until the active session settles or is cancelled.
    pub async fn wait_settled(&self) -> TrackerState {
        let mut rx = self.shared.state.subscribe();
        let result = rx
            .wait_for(|state| state.phase != TrackerPhase::Polling)
            .await
            .map(|state| state.clone());
        match result {
            Ok(state) => state,
            Err(_) => self.current(),
        }
    }

    // ---- private helpers ----

    /// Cancel the live session's tasks. Returns its id and handle.
    fn stop_active(&mut self) -> Option<(u64, JobHandle)> {
        let active = self.active.take()?;
        active.cancel.cancel();
        active.task.abort();
        Some((active.id, active.handle))
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop_active();
    }
}

/// Sequential fetch -> apply -> sleep loop for one session.
///
/// Exits on a terminal snapshot, when the session is no longer current,
/// or when `timer` is cancelled.
async fn run_poll_loop(
    shared: Arc<Shared>,
    session: u64,
    handle: JobHandle,
    timer: CancellationToken,
) {
    let mut schedule = PollSchedule::new(shared.poll_interval, shared.backoff.clone());

    loop {
        let seq = shared.next_seq();
        let outcome = tokio::select! {
            _ = timer.cancelled() => break,
            outcome = shared.fetch(&handle) => outcome,
        };

        let delay = match shared.apply(session, &handle, seq, outcome, false) {
            Applied::Snapshot { terminal: true } => {
                tracing::info!(session, task_id = %handle, "Job reached a terminal state");
                break;
            }
            Applied::Inactive | Applied::AfterSettled => break,
            Applied::Snapshot { terminal: false } => schedule.on_success(),
            Applied::TransportFailure => schedule.on_transport_error(),
            Applied::Outdated => schedule.current(),
        };

        tracing::trace!(session, delay_ms = delay.as_millis() as u64, "Next status poll scheduled");

        tokio::select! {
            _ = timer.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!(session, task_id = %handle, "Polling loop exited");
}
