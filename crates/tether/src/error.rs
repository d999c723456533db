//! Unified error types for connectors, worker tasks and listener delivery.

use std::error::Error as StdError;

use crate::ids::TaskId;
use crate::task::TaskState;

/// Boxed error accepted from listener implementations.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised by the lifecycle, registry and dispatch layers.
///
/// None of these ever escape the dispatch thread; they are returned to the
/// caller that drove the lifecycle transition.
#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    #[error("Task {0} has not been started")]
    NotStarted(TaskId),

    #[error("Task {0} has already been started")]
    AlreadyStarted(TaskId),

    #[error("Invalid state transition: {current:?} -> {requested:?}")]
    InvalidTransition {
        current: TaskState,
        requested: TaskState,
    },

    #[error("Task is in terminal state: {0:?}")]
    TerminalState(TaskState),

    #[error("Maximum registry entries reached: {0}")]
    MaxTasksReached(usize),

    #[error("Dispatch queue is closed")]
    DispatcherClosed,

    #[error("Failed to spawn dispatch thread: {0}")]
    DispatcherSpawn(#[source] std::io::Error),

    #[error("Failed to spawn worker for task {task_id}: {source}")]
    Spawn {
        task_id: TaskId,
        #[source]
        source: std::io::Error,
    },
}

/// A failure reported by (or on behalf of) a running computation.
///
/// Cloneable so it can travel inside a failure notification payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task was interrupted")]
    Interrupted,

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

impl TaskError {
    /// Wrap any displayable error as a computation failure.
    pub fn failed(err: impl std::fmt::Display) -> Self {
        TaskError::Failed(err.to_string())
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, TaskError::Interrupted)
    }
}

/// A failure raised while the dispatch thread was calling into a listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Listener operation '{tag}' failed: {source}")]
    Failed {
        tag: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Listener operation '{tag}' panicked: {message}")]
    Panicked { tag: &'static str, message: String },
}

impl ListenerError {
    /// The notification tag whose delivery failed.
    pub fn tag(&self) -> &'static str {
        match self {
            ListenerError::Failed { tag, .. } | ListenerError::Panicked { tag, .. } => *tag,
        }
    }
}

/// Render a caught panic payload as a message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
