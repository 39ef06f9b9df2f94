//! Mapping from backend exit status to run outcome.

use serde::Serialize;
use tableau_core::run_state::RunState;

/// Exit code the backend uses when its API requests time out.
pub const TIMEOUT_EXIT_CODE: i32 = 5;

/// Exit code reported when there is none (killed or signalled).
pub const NO_EXIT_CODE: i32 = -1;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Completion {
    Success,
    TimedOut,
    Failed { exit_code: i32 },
    Cancelled,
}

impl Completion {
    /// Classify a process exit. `None` means the process had no exit code.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Success,
            Some(TIMEOUT_EXIT_CODE) => Self::TimedOut,
            Some(exit_code) => Self::Failed { exit_code },
            None => Self::Failed {
                exit_code: NO_EXIT_CODE,
            },
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::TimedOut => TIMEOUT_EXIT_CODE,
            Self::Failed { exit_code } => exit_code,
            Self::Cancelled => NO_EXIT_CODE,
        }
    }

    /// Operator-facing summary.
    pub fn message(self) -> String {
        match self {
            Self::Success => "Generation completed successfully".to_string(),
            Self::TimedOut => {
                "Backend API request timed out; the backend may need a restart".to_string()
            }
            Self::Failed { exit_code } => {
                format!("Backend exited abnormally (code {exit_code})")
            }
            Self::Cancelled => "Generation cancelled".to_string(),
        }
    }

    /// Terminal run state for this outcome.
    pub fn run_state(self) -> RunState {
        if self.is_success() {
            RunState::Completed
        } else {
            RunState::Failed
        }
    }
}
