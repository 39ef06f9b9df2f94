//! One worker invocation: load the library and queue, plan the tasks,
//! then hand them to the backend and follow the run to its end.

use std::path::Path;

use anyhow::{bail, Context};
use tableau_backend::{BackendProbe, Completion, DispatchEvent, Dispatcher, Readiness};
use tableau_core::assignment::QueueItem;
use tableau_core::store::{queue_from_json_str, Library};
use tableau_pipeline::{preview_scene, run_batch_observed, BatchError, BatchPlan};

use crate::config::WorkerConfig;

/// How a worker invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Tasks were planned and printed; nothing was dispatched.
    Planned { tasks: usize },
    /// The backend ran and exited (or was cancelled).
    Dispatched(Completion),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Planned { .. } => true,
            Self::Dispatched(completion) => completion.is_success(),
        }
    }
}

/// Run the worker once with `config`.
pub async fn run(config: &WorkerConfig) -> anyhow::Result<RunOutcome> {
    let library = load_library(&config.library_path).await?;
    let queue = load_queue(config).await?;

    let plan = plan(config, &library, &queue)?;
    tracing::info!(
        prompts = plan.prompts.len(),
        tasks = plan.tasks.len(),
        warnings = plan.warnings.len(),
        "Tasks planned",
    );

    if config.plan_only {
        println!("{}", serde_json::to_string_pretty(&plan.tasks)?);
        return Ok(RunOutcome::Planned {
            tasks: plan.tasks.len(),
        });
    }

    let probe = BackendProbe::new(config.backend_url.clone(), config.readiness_timeout)
        .context("failed to build backend HTTP client")?;
    match probe.check().await {
        Readiness::Ready { status } => {
            tracing::info!(url = %probe.base_url(), status, "Backend ready");
        }
        Readiness::NotReady { reason } => {
            bail!("backend at {} is not ready: {reason}", probe.base_url());
        }
    }

    let dispatcher = Dispatcher::new(config.backend_command(), config.task_file.clone());
    let mut handle = dispatcher
        .dispatch(&plan.tasks)
        .await
        .context("failed to dispatch tasks")?;

    let cancel = handle.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            cancel.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        report(&event);
    }
    interrupt.abort();

    Ok(RunOutcome::Dispatched(handle.wait().await))
}

/// Plan the tasks for this invocation.
///
/// With a preview scene set, only that scene is rendered, cast with the
/// first queue item's assignments (or none when the queue is empty).
/// Otherwise the whole queue is planned.
pub fn plan(
    config: &WorkerConfig,
    library: &Library,
    queue: &[QueueItem],
) -> Result<BatchPlan, BatchError> {
    let options = config.batch_options();
    match &config.preview_scene {
        Some(scene_id) => {
            let (assignments, overrides) = match queue.iter().min_by_key(|item| item.order) {
                Some(item) => (
                    item.actor_assignments.clone(),
                    item.appearance_overrides.clone(),
                ),
                None => Default::default(),
            };
            preview_scene(library, scene_id, &assignments, &overrides, options)
        }
        None => run_batch_observed(library, queue, options, |state| {
            tracing::debug!(state = %state, "Run state changed");
        }),
    }
}

async fn load_library(path: &Path) -> anyhow::Result<Library> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read library {}", path.display()))?;
    Ok(Library::from_json_str(&json)?)
}

/// The queue file may be absent when previewing a single scene.
async fn load_queue(config: &WorkerConfig) -> anyhow::Result<Vec<QueueItem>> {
    let path = &config.queue_path;
    match tokio::fs::read_to_string(path).await {
        Ok(json) => Ok(queue_from_json_str(&json)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && config.preview_scene.is_some() => {
            tracing::debug!(path = %path.display(), "No queue file, previewing without casting");
            Ok(Vec::new())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read queue {}", path.display())),
    }
}

fn report(event: &DispatchEvent) {
    match event {
        DispatchEvent::Progress {
            processed,
            total,
            message,
        } => tracing::info!(processed, total, message = %message, "Progress"),
        DispatchEvent::Log { line } => tracing::debug!(line = %line, "Backend output"),
        DispatchEvent::Finished {
            success: true,
            message,
            ..
        } => tracing::info!(message = %message, "Run finished"),
        DispatchEvent::Finished {
            message, exit_code, ..
        } => tracing::warn!(exit_code, message = %message, "Run failed"),
    }
}
