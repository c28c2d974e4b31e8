//! Domain types shared by the jobtrack client and its hosts.
//!
//! Holds the job request model and its client-side validation, the
//! opaque job handle, the backend state mapping table, and the status
//! snapshot record. Nothing in this crate performs I/O.

pub mod error;
pub mod handle;
pub mod request;
pub mod snapshot;
pub mod state;
pub mod types;
