//! Single-flight dispatch of a task list to the backend process.
//!
//! A run writes the task file, launches the backend with
//! `[script] --taskSourceType json --localTaskFile <path>`, forwards its
//! output as [`DispatchEvent`]s and ends with exactly one
//! [`DispatchEvent::Finished`]. Cancelling kills the whole run; there is
//! no per-task cancel or resume.
//!
//! On unix the backend runs in its own process group, so cancelling also
//! kills anything it launched, and stderr is merged into stdout so log
//! lines arrive in the order they were written. Elsewhere the two streams
//! are read separately and events are ordered per stream only.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tableau_core::run_state::RunState;
use tableau_pipeline::GenerationTask;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::completion::Completion;
use crate::error::DispatchError;
use crate::events::DispatchEvent;
use crate::handoff::write_task_file;
use crate::progress::parse_progress;

/// Buffered events per run before the backend's output reader waits.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long output may stay open once the backend has exited or been
/// killed. Processes the backend left running can hold the pipe open.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

type OutputStream = Box<dyn AsyncRead + Unpin + Send>;

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// How to launch the backend.
#[derive(Debug, Clone)]
pub struct BackendCommand {
    /// Executable, e.g. the backend's Python interpreter.
    pub program: String,
    /// Script passed as the first argument, if any.
    pub script: Option<String>,
    pub working_dir: Option<PathBuf>,
}

impl BackendCommand {
    /// Arguments for a run reading `task_file`.
    pub fn args(&self, task_file: &Path) -> Vec<String> {
        let mut args = Vec::with_capacity(5);
        if let Some(script) = &self.script {
            args.push(script.clone());
        }
        args.extend([
            "--taskSourceType".to_string(),
            "json".to_string(),
            "--localTaskFile".to_string(),
            task_file.display().to_string(),
        ]);
        args
    }

    fn command(&self, task_file: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(task_file))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    /// Launch the backend with stderr and stdout sharing one pipe.
    #[cfg(unix)]
    fn spawn(&self, task_file: &Path) -> std::io::Result<(Child, Vec<OutputStream>)> {
        let (reader, writer) = std::io::pipe()?;
        let mut cmd = self.command(task_file);
        cmd.stdout(writer.try_clone()?).stderr(writer);
        let child = cmd.spawn()?;
        // Our copies of the write end must close for EOF to arrive.
        drop(cmd);

        let output: OutputStream = Box::new(tokio::net::unix::pipe::Receiver::from_owned_fd(
            reader.into(),
        )?);
        Ok((child, vec![output]))
    }

    #[cfg(not(unix))]
    fn spawn(&self, task_file: &Path) -> std::io::Result<(Child, Vec<OutputStream>)> {
        let mut child = self
            .command(task_file)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let mut streams: Vec<OutputStream> = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            streams.push(Box::new(out));
        }
        if let Some(err) = child.stderr.take() {
            streams.push(Box::new(err));
        }
        Ok((child, streams))
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Launches runs against one backend, refusing overlapping runs.
pub struct Dispatcher {
    command: BackendCommand,
    task_file: PathBuf,
    busy: Arc<AtomicBool>,
}

/// Marks the dispatcher busy for as long as it is alive.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Dispatcher {
    pub fn new(command: BackendCommand, task_file: impl Into<PathBuf>) -> Self {
        Self {
            command,
            task_file: task_file.into(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn task_file(&self) -> &Path {
        &self.task_file
    }

    /// Whether a run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start a run for `tasks`.
    ///
    /// Fails without side effects when `tasks` is empty or another run is
    /// in flight. Must be called from within a Tokio runtime.
    pub async fn dispatch(&self, tasks: &[GenerationTask]) -> Result<DispatchHandle, DispatchError> {
        if tasks.is_empty() {
            return Err(DispatchError::NoTasks);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DispatchError::AlreadyRunning);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));

        write_task_file(&self.task_file, tasks).await?;

        let (child, output) = self
            .command
            .spawn(&self.task_file)
            .map_err(|source| DispatchError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        let run_id = Uuid::now_v7();
        let total = tasks.len();
        tracing::info!(
            %run_id,
            total,
            program = %self.command.program,
            task_file = %self.task_file.display(),
            "Backend run started",
        );

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(RunState::Dispatched);
        let cancel = CancellationToken::new();

        let join = tokio::spawn(supervise(
            child,
            output,
            run_id,
            total,
            events_tx,
            state_tx,
            cancel.clone(),
            guard,
        ));

        Ok(DispatchHandle {
            run_id,
            events: events_rx,
            state: state_rx,
            cancel,
            join,
        })
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Caller's side of an in-flight run.
pub struct DispatchHandle {
    pub run_id: Uuid,
    events: mpsc::Receiver<DispatchEvent>,
    state: watch::Receiver<RunState>,
    cancel: CancellationToken,
    join: JoinHandle<Completion>,
}

impl std::fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("run_id", &self.run_id)
            .field("state", &self.state())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl DispatchHandle {
    /// Next event, or `None` once `Finished` has been delivered.
    pub async fn next_event(&mut self) -> Option<DispatchEvent> {
        self.events.recv().await
    }

    /// Current run state: `Dispatched`, then `Completed` or `Failed`.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Kill the backend and fail the run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this run, for use from another task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to end, discarding remaining events.
    pub async fn wait(mut self) -> Completion {
        while self.events.recv().await.is_some() {}
        self.join.await.unwrap_or(Completion::Failed {
            exit_code: crate::completion::NO_EXIT_CODE,
        })
    }
}

// ---------------------------------------------------------------------------
// Supervision
// ---------------------------------------------------------------------------

async fn supervise(
    mut child: Child,
    output: Vec<OutputStream>,
    run_id: Uuid,
    total: usize,
    events: mpsc::Sender<DispatchEvent>,
    state: watch::Sender<RunState>,
    cancel: CancellationToken,
    _guard: BusyGuard,
) -> Completion {
    let _ = events
        .send(DispatchEvent::Progress {
            processed: 0,
            total,
            message: "Generation started".to_string(),
        })
        .await;

    let readers: Vec<JoinHandle<()>> = output
        .into_iter()
        .map(|stream| spawn_reader(stream, events.clone()))
        .collect();

    let completion = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => Completion::from_exit_code(status.code()),
            Err(e) => {
                tracing::error!(%run_id, error = %e, "Failed to wait for backend");
                Completion::from_exit_code(None)
            }
        },
        _ = cancel.cancelled() => {
            tracing::info!(%run_id, "Cancelling backend run");
            kill_backend(&mut child, run_id).await;
            Completion::Cancelled
        }
    };

    // Drain output so `Finished` is the last event.
    for mut reader in readers {
        if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut reader)
            .await
            .is_err()
        {
            tracing::warn!(%run_id, "Backend output still open after exit, detaching");
            reader.abort();
        }
    }

    if completion.is_success() {
        let _ = events
            .send(DispatchEvent::Progress {
                processed: total,
                total,
                message: "Generation complete".to_string(),
            })
            .await;
    }

    let message = completion.message();
    if completion.is_success() {
        tracing::info!(%run_id, total, "Backend run completed");
    } else {
        tracing::warn!(%run_id, exit_code = completion.exit_code(), message = %message, "Backend run failed");
    }

    state.send_replace(completion.run_state());
    let _ = events
        .send(DispatchEvent::Finished {
            success: completion.is_success(),
            message,
            exit_code: completion.exit_code(),
        })
        .await;

    completion
}

/// Kill the backend and, on unix, every process in its group.
async fn kill_backend(child: &mut Child, run_id: Uuid) {
    #[cfg(unix)]
    {
        if let Some(pgid) = child.id().and_then(|pid| libc::pid_t::try_from(pid).ok()) {
            // SAFETY: killpg only sends a signal; the group was created for
            // this child by `process_group(0)`.
            if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
                tracing::warn!(
                    %run_id,
                    error = %std::io::Error::last_os_error(),
                    "Failed to kill backend process group",
                );
            }
        }
    }
    if let Err(e) = child.kill().await {
        tracing::error!(%run_id, error = %e, "Failed to kill backend");
    }
}

/// Forward every non-empty line of `stream` as a log event, followed by
/// any progress markers it contains.
fn spawn_reader<R>(stream: R, events: mpsc::Sender<DispatchEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "Backend output stream ended with error");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let updates = parse_progress(line);
            if events
                .send(DispatchEvent::Log {
                    line: line.to_string(),
                })
                .await
                .is_err()
            {
                break;
            }
            for update in updates {
                let _ = events
                    .send(DispatchEvent::Progress {
                        processed: update.processed,
                        total: update.total,
                        message: update.message,
                    })
                    .await;
            }
        }
    })
}
