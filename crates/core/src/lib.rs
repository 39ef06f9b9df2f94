//! Domain types for the prompt composition engine.
//!
//! This crate has no internal dependencies: it defines the reference
//! library entities, the read-only store contract, generation parameters,
//! filename conventions and the batch run state machine. The engine
//! itself lives in `tableau-pipeline`.

pub mod assignment;
pub mod error;
pub mod naming;
pub mod params;
pub mod reference;
pub mod run_state;
pub mod scene;
pub mod store;
pub mod types;
