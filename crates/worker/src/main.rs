//! `tableau-worker` -- plans a generation queue and drives the backend.
//!
//! Loads the reference library and queue from JSON files, expands them
//! into generation tasks and hands those to the image-generation
//! backend, logging progress until the run ends. See
//! [`WorkerConfig::from_env`] for the full environment variable table.
//!
//! # Environment variables
//!
//! | Variable                | Default             | Description                          |
//! |-------------------------|---------------------|--------------------------------------|
//! | `TABLEAU_LIBRARY_PATH`  | `data/library.json` | Reference library snapshot           |
//! | `TABLEAU_QUEUE_PATH`    | `data/queue.json`   | Queue items to plan                  |
//! | `TABLEAU_PREVIEW_SCENE` | --                  | Render only this scene               |
//! | `TABLEAU_PLAN_ONLY`     | `false`             | Print tasks as JSON and skip dispatch |

use std::process::ExitCode;

use tableau_worker::WorkerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tableau_worker=info,tableau_pipeline=info,tableau_backend=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        library = %config.library_path.display(),
        queue = %config.queue_path.display(),
        preview_scene = config.preview_scene.as_deref().unwrap_or("-"),
        plan_only = config.plan_only,
        "Starting tableau-worker",
    );

    match tableau_worker::run(&config).await {
        Ok(outcome) if outcome.is_success() => ExitCode::SUCCESS,
        Ok(outcome) => {
            tracing::error!(outcome = ?outcome, "Generation did not complete");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %format_args!("{e:#}"), "Worker failed");
            ExitCode::FAILURE
        }
    }
}
