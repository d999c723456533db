//! Task Executor: where a worker task's computation runs.
//!
//! Separates *where a computation runs* from *how its notifications travel*.
//! `ThreadExecutor` gives every task its own OS thread; `TokioTaskExecutor`
//! shares the worker threads of an existing runtime.

use std::future::Future;
use std::pin::Pin;
use std::thread;

use tokio::runtime::{Builder, Handle};
use tracing::debug;

use crate::config::TaskConfig;
use crate::error::TetherError;
use crate::ids::TaskId;

/// Boxed async work unit: the whole lifetime of one worker task.
pub type BoxedTaskWork = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Trait for starting task work off the dispatch thread.
pub trait TaskExecutor: Send + Sync {
    /// Start executing `work`. Must not block the caller.
    fn spawn(&self, task_id: TaskId, work: BoxedTaskWork) -> Result<(), TetherError>;
}

/// Runs each task on a dedicated, named OS thread driving a current-thread
/// runtime.
#[derive(Debug, Clone, Default)]
pub struct ThreadExecutor {
    config: TaskConfig,
}

impl ThreadExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TaskConfig) -> Self {
        Self { config }
    }
}

impl TaskExecutor for ThreadExecutor {
    fn spawn(&self, task_id: TaskId, work: BoxedTaskWork) -> Result<(), TetherError> {
        // Built before spawning so a failure is returned to the caller.
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| TetherError::Spawn { task_id, source })?;

        let name = format!("{}-{}", self.config.thread_name_prefix, task_id.get());
        thread::Builder::new()
            .name(name)
            .spawn(move || {
                runtime.block_on(work);
                debug!(task_id = %task_id, "Worker thread exiting");
            })
            .map(|_| ())
            .map_err(|source| TetherError::Spawn { task_id, source })
    }
}

/// Runs tasks as tokio tasks on an existing runtime.
#[derive(Debug, Clone)]
pub struct TokioTaskExecutor {
    handle: Handle,
}

impl TokioTaskExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl TaskExecutor for TokioTaskExecutor {
    fn spawn(&self, task_id: TaskId, work: BoxedTaskWork) -> Result<(), TetherError> {
        self.handle.spawn(work);
        debug!(task_id = %task_id, "Spawned worker on tokio runtime");
        Ok(())
    }
}
