//! Job submission and status tracking client.
//!
//! Provides the HTTP backend wrapper, the stateless [`Submitter`],
//! the polling [`Tracker`] with its cancel-before-start session model,
//! transport backoff, configuration, and tracker event types.
//!
//! [`Submitter`]: submitter::Submitter
//! [`Tracker`]: tracker::Tracker

pub mod api;
pub mod backoff;
pub mod config;
pub mod events;
pub mod submitter;
pub mod tracker;
