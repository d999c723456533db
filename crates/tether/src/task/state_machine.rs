//! Worker task lifecycle.
//!
//! ```text
//! NotStarted -> Running
//! Running    -> Completed | Cancelled
//! Completed/Cancelled -> ERROR (terminal, no further transitions)
//! ```
//!
//! A computation that fails still ends in `Completed`; the failure travels to
//! the listener as a notification rather than as a state.

use crate::error::TetherError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    NotStarted,
    Running,
    Completed,
    Cancelled,
}

/// Validate a lifecycle transition.
pub fn validate_transition(from: TaskState, to: TaskState) -> Result<(), TetherError> {
    match from {
        TaskState::NotStarted => match to {
            TaskState::Running => Ok(()),
            _ => Err(TetherError::InvalidTransition {
                current: from,
                requested: to,
            }),
        },
        TaskState::Running => match to {
            TaskState::Completed | TaskState::Cancelled => Ok(()),
            TaskState::NotStarted | TaskState::Running => Err(TetherError::InvalidTransition {
                current: from,
                requested: to,
            }),
        },
        TaskState::Completed | TaskState::Cancelled => Err(TetherError::TerminalState(from)),
    }
}

/// Returns `true` for absorbing states.
pub fn is_terminal(state: TaskState) -> bool {
    matches!(state, TaskState::Completed | TaskState::Cancelled)
}
