//! `tableau-worker` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod runner;

pub use config::{ConfigError, WorkerConfig};
pub use runner::{run, RunOutcome};
