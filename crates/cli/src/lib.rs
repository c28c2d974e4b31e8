//! Command-line host for the job submitter and status tracker.

pub mod interactive;
pub mod output;
