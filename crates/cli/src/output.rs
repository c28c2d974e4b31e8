//! Rendering of submissions, tracker state and health reports.
//!
//! Every renderer returns the text instead of printing it so the
//! interactive loop can suppress repeats.

use clap::ValueEnum;
use serde::Serialize;

use jobtrack_client::api::HealthReport;
use jobtrack_client::tracker::{TrackerPhase, TrackerState};
use jobtrack_core::handle::JobHandle;
use jobtrack_core::types::Timestamp;

/// Shown until the first snapshot of a session arrives.
pub const FETCHING_LABEL: &str = "Fetching...";
pub const FETCHING_DESCRIPTION: &str = "Polling latest state";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct SubmittedOutput<'a> {
    task_id: &'a str,
    short_id: &'a str,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    task_id: Option<&'a str>,
    phase: TrackerPhase,
    state: Option<&'a str>,
    label: String,
    description: Option<String>,
    message: Option<&'a str>,
    result: Option<&'a serde_json::Value>,
    error: Option<&'a str>,
    transport_error: Option<&'a str>,
    last_updated: Option<Timestamp>,
    refreshing: bool,
}

// =============================================================================
// Renderers
// =============================================================================

pub fn render_submitted(
    handle: &JobHandle,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&SubmittedOutput {
            task_id: handle.as_str(),
            short_id: handle.short(),
        }),
        OutputFormat::Table => Ok(format!("Task queued:     {handle}")),
    }
}

/// Render the tracker's view of the current job.
pub fn render_status(state: &TrackerState, format: OutputFormat) -> Result<String, serde_json::Error> {
    let presentation = state.presentation();
    let (label, description) = match presentation {
        Some(p) => (p.label, p.description),
        None => (FETCHING_LABEL.to_string(), Some(FETCHING_DESCRIPTION.to_string())),
    };
    let snapshot = state.snapshot.as_ref();

    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&StatusOutput {
            task_id: state.handle.as_ref().map(JobHandle::as_str),
            phase: state.phase,
            state: snapshot.map(|s| s.state.as_wire()),
            label,
            description,
            message: snapshot.and_then(|s| s.message.as_deref()),
            result: snapshot.and_then(|s| s.result.as_ref()),
            error: snapshot.and_then(|s| s.error.as_deref()),
            transport_error: state.transport_error.as_ref().map(|e| e.message.as_str()),
            last_updated: state.last_success_at,
            refreshing: state.refreshing,
        }),
        OutputFormat::Table => {
            let Some(handle) = &state.handle else {
                return Ok("No task selected".to_string());
            };

            let mut lines = vec![format!("Tracking task:   {} ({})", handle.short(), handle)];
            lines.push(format!("State:           {label}"));
            if let Some(description) = description {
                lines.push(format!("Description:     {description}"));
            }

            if let Some(snapshot) = snapshot {
                if let Some(message) = &snapshot.message {
                    lines.push(format!("Message:         {message}"));
                }
                match (snapshot.processed_result(), &snapshot.result) {
                    (Some(result), _) => {
                        lines.push(format!("Processed items: {}", result.processed_items));
                        lines.push(format!("Result:          {}", result.result_message));
                    }
                    (None, Some(raw)) => lines.push(format!("Result:          {raw}")),
                    (None, None) => {}
                }
                if let Some(error) = &snapshot.error {
                    lines.push(format!("Error:           {error}"));
                }
            }

            if let Some(err) = &state.transport_error {
                lines.push(format!("Warning:         {}", err.message));
            }
            if let Some(at) = state.last_success_at {
                lines.push(format!(
                    "Last updated:    {}",
                    at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            if state.refreshing {
                lines.push("Refreshing...".to_string());
            }
            Ok(lines.join("\n"))
        }
    }
}

pub fn render_health(
    reports: &[HealthReport],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(reports),
        OutputFormat::Table => {
            let mut lines = vec![format!("{:<8} {:<10} {:<6} DETAIL", "NAME", "STATUS", "CODE")];
            for report in reports {
                let status = if report.healthy { "healthy" } else { "unhealthy" };
                let code = match report.status_code {
                    0 => "-".to_string(),
                    code => code.to_string(),
                };
                lines.push(format!(
                    "{:<8} {:<10} {:<6} {}",
                    report.component,
                    status,
                    code,
                    health_detail(&report.body)
                ));
            }
            Ok(lines.join("\n"))
        }
    }
}

/// Pick the most useful line out of a health response body.
fn health_detail(body: &serde_json::Value) -> String {
    for key in ["detail", "status"] {
        if let Some(text) = body.get(key).and_then(|v| v.as_str()) {
            return text.to_string();
        }
    }
    match body {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
