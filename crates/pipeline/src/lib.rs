//! Prompt composition and resolution engine.
//!
//! Turns scenes, role assignments and appearance overrides into ordered,
//! reproducible prompts and generation tasks:
//!
//! - [`resolver`] picks per-role candidate lists for each appearance slot.
//! - [`expander`] counts, guards and materializes the Cartesian product.
//! - [`palette`] and [`render`] compose role text and fill cut templates.
//! - [`task`] maps rendered prompts onto backend task descriptors.
//! - [`batch`] runs a whole queue with one global ordinal counter.
//!
//! Everything here is synchronous and reads only from a
//! [`ReferenceStore`](tableau_core::store::ReferenceStore) snapshot.

pub mod batch;
pub mod error;
pub mod expander;
pub mod palette;
pub mod render;
pub mod resolver;
pub mod task;
pub mod tokens;

pub use batch::{preview_scene, run_batch, run_batch_observed, BatchOptions, BatchPlan};
pub use error::{BatchError, RenderWarning, ResolveError, SceneError};
pub use task::{GeneratedPrompt, GenerationTask, TaskMetadata};
