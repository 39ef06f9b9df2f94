//! Generation backend bridge.
//!
//! Hands a planned task list to the external image-generation backend
//! and supervises the run:
//!
//! - [`readiness`] probes the backend's HTTP endpoint.
//! - [`handoff`] writes the task list file the backend reads.
//! - [`dispatcher`] launches the backend process, one run at a time, and
//!   streams [`events::DispatchEvent`]s until it exits or is cancelled.

pub mod completion;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod handoff;
pub mod progress;
pub mod readiness;

pub use completion::Completion;
pub use dispatcher::{BackendCommand, DispatchHandle, Dispatcher};
pub use error::DispatchError;
pub use events::DispatchEvent;
pub use readiness::{BackendProbe, Readiness};
