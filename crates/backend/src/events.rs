//! Events emitted while a generation run is in flight.
//!
//! Events for one run arrive in order on a single channel; `Finished` is
//! always the last one.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// `processed` of `total` tasks are done.
    Progress {
        processed: usize,
        total: usize,
        message: String,
    },

    /// One raw output line from the backend (stdout or stderr).
    Log { line: String },

    /// The run ended. Any non-success is a failure of the whole run.
    Finished {
        success: bool,
        message: String,
        /// `-1` when the process was killed or ended by a signal.
        exit_code: i32,
    },
}
