use std::path::PathBuf;

/// Reasons a dispatch request is refused before the backend runs.
///
/// Once the backend process has started, failures are reported through
/// [`crate::events::DispatchEvent::Finished`] instead.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No tasks to generate")]
    NoTasks,

    /// Only one run may be in flight per backend.
    #[error("A generation run is already in progress")]
    AlreadyRunning,

    #[error("Failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write task file {}: {source}", .path.display())]
    Handoff {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start backend '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
