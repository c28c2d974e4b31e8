//! Line-driven control of a tracker.
//!
//! Each input line is one command: `r` refreshes, `q` quits, anything
//! else is taken as a task id and replaces the tracked handle. State
//! changes are printed as they happen. Once input is exhausted the loop
//! keeps going until the current session settles.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use jobtrack_client::tracker::{Tracker, TrackerPhase};
use jobtrack_core::handle::JobHandle;

use crate::output::{render_status, OutputFormat};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackCommand {
    Refresh,
    Quit,
    Track(JobHandle),
}

/// Parse an input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<TrackCommand> {
    match line.trim() {
        "" => None,
        "r" | "refresh" => Some(TrackCommand::Refresh),
        "q" | "quit" | "exit" => Some(TrackCommand::Quit),
        id => JobHandle::parse(id).ok().map(TrackCommand::Track),
    }
}

/// Drive `tracker` from `input` and print every distinct state to `out`.
pub async fn run<R, W>(
    tracker: &mut Tracker,
    input: R,
    out: &mut W,
    format: OutputFormat,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut updates = tracker.watch();
    let mut lines = input.lines();
    let mut input_open = true;
    let mut last_printed = String::new();

    loop {
        let state = updates.borrow_and_update().clone();
        let rendered = render_status(&state, format)?;
        if rendered != last_printed {
            writeln!(out, "{rendered}\n")?;
            out.flush()?;
            last_printed = rendered;
        }

        if !input_open && state.phase != TrackerPhase::Polling {
            return Ok(());
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    input_open = false;
                    continue;
                };
                match parse_command(&line) {
                    None => {}
                    Some(TrackCommand::Quit) => return Ok(()),
                    Some(TrackCommand::Refresh) => {
                        if !tracker.refresh() {
                            writeln!(out, "Refresh unavailable")?;
                        }
                    }
                    Some(TrackCommand::Track(handle)) => {
                        tracing::debug!(task_id = %handle, "Switching tracked task");
                        tracker.start_session(handle);
                    }
                }
            }
        }
    }
}
