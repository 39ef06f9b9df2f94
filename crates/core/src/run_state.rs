//! Batch run state machine.
//!
//! ```text
//! Idle -> Resolving(0) -> Rendering(0) -> Resolving(1) -> ... -> TasksReady
//!      -> Dispatched -> Completed | Failed
//! ```
//!
//! There is no paused state: a run is planned in full before dispatch and
//! the backend reports a single pass/fail for the whole run.

use serde::Serialize;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Resolving { scene_index: usize },
    Rendering { scene_index: usize },
    TasksReady,
    Dispatched,
    Completed,
    Failed,
}

impl RunState {
    /// Completed and Failed accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check whether moving from `self` to `to` is allowed.
    pub fn can_transition(self, to: RunState) -> bool {
        use RunState::*;
        match (self, to) {
            // A batch with no enabled scenes is ready immediately.
            (Idle, Resolving { scene_index: 0 }) | (Idle, TasksReady) => true,
            (Resolving { scene_index: a }, Rendering { scene_index: b }) => a == b,
            (Rendering { scene_index: a }, Resolving { scene_index: b }) => b == a + 1,
            (Rendering { .. }, TasksReady) => true,
            (Resolving { .. } | Rendering { .. } | TasksReady, Failed) => true,
            (TasksReady, Dispatched) => true,
            (Dispatched, Completed | Failed) => true,
            _ => false,
        }
    }

    /// Validate a transition, describing both ends when it is rejected.
    pub fn validate_transition(self, to: RunState) -> Result<(), CoreError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Invalid run transition: {self} -> {to}"
            )))
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Resolving { scene_index } => write!(f, "Resolving({scene_index})"),
            Self::Rendering { scene_index } => write!(f, "Rendering({scene_index})"),
            Self::TasksReady => f.write_str("TasksReady"),
            Self::Dispatched => f.write_str("Dispatched"),
            Self::Completed => f.write_str("Completed"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RunState::*;
    use super::*;

    // -- valid transitions --

    #[test]
    fn idle_starts_first_scene() {
        assert!(Idle.can_transition(Resolving { scene_index: 0 }));
        assert!(!Idle.can_transition(Resolving { scene_index: 1 }));
    }

    #[test]
    fn idle_to_ready_for_empty_batch() {
        assert!(Idle.can_transition(TasksReady));
    }

    #[test]
    fn resolve_then_render_same_scene() {
        assert!(Resolving { scene_index: 2 }.can_transition(Rendering { scene_index: 2 }));
        assert!(!Resolving { scene_index: 2 }.can_transition(Rendering { scene_index: 3 }));
    }

    #[test]
    fn render_advances_to_next_scene_only() {
        assert!(Rendering { scene_index: 0 }.can_transition(Resolving { scene_index: 1 }));
        assert!(!Rendering { scene_index: 0 }.can_transition(Resolving { scene_index: 2 }));
        assert!(!Rendering { scene_index: 1 }.can_transition(Resolving { scene_index: 1 }));
    }

    #[test]
    fn dispatch_path() {
        assert!(Rendering { scene_index: 4 }.can_transition(TasksReady));
        assert!(TasksReady.can_transition(Dispatched));
        assert!(Dispatched.can_transition(Completed));
        assert!(Dispatched.can_transition(Failed));
    }

    #[test]
    fn resolution_failures() {
        assert!(Resolving { scene_index: 0 }.can_transition(Failed));
        assert!(Rendering { scene_index: 0 }.can_transition(Failed));
        assert!(TasksReady.can_transition(Failed));
    }

    // -- invalid transitions --

    #[test]
    fn terminal_states_are_final() {
        for to in [Idle, TasksReady, Dispatched, Completed, Failed] {
            assert!(!Completed.can_transition(to));
            assert!(!Failed.can_transition(to));
        }
        assert!(Completed.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Dispatched.is_terminal());
    }

    #[test]
    fn no_dispatch_before_ready() {
        assert!(!Idle.can_transition(Dispatched));
        assert!(!Rendering { scene_index: 0 }.can_transition(Dispatched));
    }

    #[test]
    fn no_completion_without_dispatch() {
        assert!(!TasksReady.can_transition(Completed));
    }

    #[test]
    fn validate_transition_message_names_states() {
        let err = TasksReady.validate_transition(Completed).unwrap_err();
        assert!(err.to_string().contains("TasksReady -> Completed"));
    }
}
