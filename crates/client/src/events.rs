//! Events emitted by the status tracker.
//!
//! Every change the tracker applies to its visible state is mirrored as
//! one [`TrackerEvent`], in the same order the changes were applied.

use serde::Serialize;

use jobtrack_core::handle::JobHandle;
use jobtrack_core::snapshot::JobSnapshot;
use jobtrack_core::state::JobState;

use crate::tracker::TransportError;

/// A lifecycle event from a [`Tracker`](crate::tracker::Tracker).
#[derive(Debug, Clone, Serialize)]
pub enum TrackerEvent {
    /// A handle was assigned and polling began.
    SessionStarted { session: u64, handle: JobHandle },

    /// A successful fetch produced a new snapshot.
    SnapshotUpdated {
        session: u64,
        handle: JobHandle,
        /// Poll sequence number of the fetch that produced it.
        seq: u64,
        snapshot: JobSnapshot,
    },

    /// A fetch failed; polling continues.
    TransportFailed {
        session: u64,
        handle: JobHandle,
        error: TransportError,
    },

    /// A terminal state was observed and the timer stopped.
    Settled {
        session: u64,
        handle: JobHandle,
        state: JobState,
    },

    /// The session ended because the handle was cleared or replaced.
    SessionCancelled { session: u64, handle: JobHandle },
}

impl TrackerEvent {
    /// Session the event belongs to.
    pub fn session(&self) -> u64 {
        match self {
            Self::SessionStarted { session, .. }
            | Self::SnapshotUpdated { session, .. }
            | Self::TransportFailed { session, .. }
            | Self::Settled { session, .. }
            | Self::SessionCancelled { session, .. } => *session,
        }
    }
}
