//! Jobs for the inactivity report.
//!
//! - [`run_sync`] performs a single pass and returns a structured [`SyncReport`]
//! - [`start_sync_worker`] repeats the pass at the configured interval
//!
//! # Example
//!
//! ```toml
//! [schedule]
//! interval_secs = 86400
//! ```

mod inactivity_sync;

pub use inactivity_sync::{
    SyncError, SyncOptions, SyncReport, collect_report, run_sync, start_sync_worker,
};
