//! Task list handoff file.
//!
//! The backend reads its work from a JSON array of task objects, pretty
//! printed, in ordinal order.

use std::path::Path;

use tableau_pipeline::GenerationTask;

use crate::error::DispatchError;

/// Serialize `tasks` for the backend.
pub fn encode_tasks(tasks: &[GenerationTask]) -> Result<Vec<u8>, DispatchError> {
    Ok(serde_json::to_vec_pretty(tasks)?)
}

/// Write the task file, creating parent directories as needed.
pub async fn write_task_file(path: &Path, tasks: &[GenerationTask]) -> Result<(), DispatchError> {
    let bytes = encode_tasks(tasks)?;
    let handoff_err = |source| DispatchError::Handoff {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(handoff_err)?;
    }
    tokio::fs::write(path, bytes).await.map_err(handoff_err)?;

    tracing::info!(path = %path.display(), tasks = tasks.len(), "Task file written");
    Ok(())
}
