use std::path::PathBuf;
use std::time::Duration;

use tableau_backend::BackendCommand;
use tableau_pipeline::expander::DEFAULT_MAX_COMBINATIONS;
use tableau_pipeline::BatchOptions;

/// A configuration value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{var} must be {expected} (got '{value}')")]
pub struct ConfigError {
    pub var: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Worker configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub library_path: PathBuf,
    pub queue_path: PathBuf,
    /// When set, only this scene is rendered (preview path).
    pub preview_scene: Option<String>,
    pub task_file: PathBuf,
    pub backend_url: String,
    pub backend_program: String,
    /// `None` when the program is the backend itself.
    pub backend_script: Option<String>,
    pub backend_workdir: PathBuf,
    pub debug_scaling: bool,
    pub max_combinations: u64,
    /// Print the planned tasks and stop before dispatch.
    pub plan_only: bool,
    pub readiness_timeout: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `TABLEAU_LIBRARY_PATH`           | `data/library.json`     |
    /// | `TABLEAU_QUEUE_PATH`             | `data/queue.json`       |
    /// | `TABLEAU_PREVIEW_SCENE`          | unset                   |
    /// | `TABLEAU_TASK_FILE`              | `data/tasks.json`       |
    /// | `TABLEAU_BACKEND_URL`            | `http://127.0.0.1:7860` |
    /// | `TABLEAU_BACKEND_PROGRAM`        | `python`                |
    /// | `TABLEAU_BACKEND_SCRIPT`         | `GenImage.py`           |
    /// | `TABLEAU_BACKEND_WORKDIR`        | `.`                     |
    /// | `TABLEAU_DEBUG_SCALING`          | `false`                 |
    /// | `TABLEAU_MAX_COMBINATIONS`       | `500`                   |
    /// | `TABLEAU_PLAN_ONLY`              | `false`                 |
    /// | `TABLEAU_READINESS_TIMEOUT_SECS` | `5`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_script = match lookup("TABLEAU_BACKEND_SCRIPT") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v),
            None => Some("GenImage.py".to_string()),
        };

        Ok(Self {
            library_path: string("TABLEAU_LIBRARY_PATH", "data/library.json").into(),
            queue_path: string("TABLEAU_QUEUE_PATH", "data/queue.json").into(),
            preview_scene: non_empty("TABLEAU_PREVIEW_SCENE"),
            task_file: string("TABLEAU_TASK_FILE", "data/tasks.json").into(),
            backend_url: string("TABLEAU_BACKEND_URL", "http://127.0.0.1:7860"),
            backend_program: string("TABLEAU_BACKEND_PROGRAM", "python"),
            backend_script,
            backend_workdir: string("TABLEAU_BACKEND_WORKDIR", ".").into(),
            debug_scaling: parse_bool("TABLEAU_DEBUG_SCALING", lookup("TABLEAU_DEBUG_SCALING"))?,
            max_combinations: parse_u64(
                "TABLEAU_MAX_COMBINATIONS",
                lookup("TABLEAU_MAX_COMBINATIONS"),
                DEFAULT_MAX_COMBINATIONS,
            )?,
            plan_only: parse_bool("TABLEAU_PLAN_ONLY", lookup("TABLEAU_PLAN_ONLY"))?,
            readiness_timeout: Duration::from_secs(parse_u64(
                "TABLEAU_READINESS_TIMEOUT_SECS",
                lookup("TABLEAU_READINESS_TIMEOUT_SECS"),
                5,
            )?),
        })
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            debug_scaling: self.debug_scaling,
            max_combinations: self.max_combinations,
        }
    }

    pub fn backend_command(&self) -> BackendCommand {
        BackendCommand {
            program: self.backend_program.clone(),
            script: self.backend_script.clone(),
            working_dir: Some(self.backend_workdir.clone()),
        }
    }
}

fn parse_bool(var: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(ConfigError {
            var,
            expected: "a boolean",
            value,
        }),
    }
}

fn parse_u64(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError {
            var,
            expected: "a non-negative integer",
            value,
        }),
    }
}
