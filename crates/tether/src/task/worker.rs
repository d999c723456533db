//! Worker task: a single-shot background computation publishing through a
//! [`Connector`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::TaskConfig;
use crate::connector::Connector;
use crate::dispatch::DispatchQueue;
use crate::error::{TaskError, TetherError, panic_message};
use crate::ids::TaskId;
use crate::listener::Notification;
use crate::registry::TaskRegistry;
use crate::task::context::TaskContext;
use crate::task::executor::{TaskExecutor, ThreadExecutor};
use crate::task::interrupt::InterruptSignal;
use crate::task::state_machine::{TaskState, is_terminal, validate_transition};

/// Why a computation stopped without finishing normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task_id: TaskId,
    pub error: TaskError,
    /// Time from start until the failure was observed
    pub elapsed: Duration,
}

/// The work a [`WorkerTask`] performs.
#[async_trait]
pub trait Computation: Send + Sync + 'static {
    /// Input handed to [`WorkerTask::execute`].
    type Params: Send + 'static;

    /// Notifications this computation publishes.
    type Message: Notification;

    /// Perform the work, publishing through `ctx`.
    ///
    /// Returning `Err` (or panicking) ends the task; the error is offered to
    /// [`failure_message`](Self::failure_message).
    async fn run(
        &self,
        ctx: &TaskContext<Self::Message>,
        params: Self::Params,
    ) -> Result<(), TaskError>;

    /// Map a failure to the notification the listener should receive.
    fn failure_message(&self, _failure: &TaskFailure) -> Option<Self::Message> {
        None
    }
}

struct TaskShared {
    id: TaskId,
    state: watch::Sender<TaskState>,
    exited: watch::Sender<bool>,
    interrupt: InterruptSignal,
}

impl TaskShared {
    fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Apply a validated transition atomically with respect to other callers.
    fn transition(&self, to: TaskState) -> Result<(), TetherError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|current| match validate_transition(*current, to) {
            Ok(()) => {
                *current = to;
                true
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }
}

/// A single-shot background computation whose notifications survive the
/// replacement of their listener.
///
/// Dropping the `WorkerTask` does not stop the computation; it keeps
/// publishing through its connector, which stays reachable through the
/// registry by [`id`](Self::id). A task dropped before
/// [`execute`](Self::execute) is removed from the registry.
pub struct WorkerTask<C: Computation> {
    computation: Arc<C>,
    connector: Connector<C::Message>,
    shared: Arc<TaskShared>,
    config: TaskConfig,
}

impl<C: Computation> WorkerTask<C> {
    /// Create a task and register its connector.
    pub fn new(
        registry: &TaskRegistry,
        queue: Arc<dyn DispatchQueue>,
        computation: C,
    ) -> Result<Self, TetherError> {
        let connector = Connector::new(registry, queue)?;
        let (state, _) = watch::channel(TaskState::NotStarted);
        let (exited, _) = watch::channel(false);

        Ok(Self {
            computation: Arc::new(computation),
            shared: Arc::new(TaskShared {
                id: connector.id(),
                state,
                exited,
                interrupt: InterruptSignal::new(),
            }),
            connector,
            config: TaskConfig::default(),
        })
    }

    pub fn with_config(mut self, config: TaskConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    pub fn connector(&self) -> &Connector<C::Message> {
        &self.connector
    }

    /// Install or detach the listener; see [`Connector::set_listener`].
    pub fn set_listener(&self, listener: Option<Arc<<C::Message as Notification>::Target>>) {
        self.connector.set_listener(listener);
    }

    /// Start the computation on its own dedicated thread.
    pub fn execute(&self, params: C::Params) -> Result<(), TetherError> {
        self.execute_on(&ThreadExecutor::with_config(self.config.clone()), params)
    }

    /// Start the computation on `executor`.
    ///
    /// A task runs at most once; a second call fails with
    /// [`TetherError::AlreadyStarted`].
    pub fn execute_on(
        &self,
        executor: &dyn TaskExecutor,
        params: C::Params,
    ) -> Result<(), TetherError> {
        let id = self.id();
        if self.shared.transition(TaskState::Running).is_err() {
            return Err(TetherError::AlreadyStarted(id));
        }

        let ctx = TaskContext::new(self.connector.clone(), self.shared.interrupt.clone());
        let work = run_to_exit(Arc::clone(&self.computation), ctx, params, Arc::clone(&self.shared));

        if let Err(e) = executor.spawn(id, Box::pin(work)) {
            warn!(task_id = %id, error = %e, "Worker could not be started");
            let _ = self.shared.transition(TaskState::Completed);
            self.connector.finish();
            self.shared.exited.send_replace(true);
            return Err(e);
        }

        info!(task_id = %id, "Task started");
        Ok(())
    }

    /// Request cancellation.
    ///
    /// Fails with [`TetherError::NotStarted`] before `execute`. Returns
    /// `Ok(false)` once the task has finished or been cancelled, and when
    /// `interrupt_if_running` is `false` for a running task, which is then
    /// left alone. Otherwise the task is marked cancelled, the computation's
    /// pending interruptible wait ends with [`TaskError::Interrupted`], and
    /// `Ok(true)` is returned.
    pub fn cancel(&self, interrupt_if_running: bool) -> Result<bool, TetherError> {
        let id = self.id();
        match self.state() {
            TaskState::NotStarted => Err(TetherError::NotStarted(id)),
            TaskState::Completed | TaskState::Cancelled => Ok(false),
            TaskState::Running if !interrupt_if_running => {
                debug!(task_id = %id, "Cancel without interruption leaves a running task alone");
                Ok(false)
            }
            TaskState::Running => {
                if self.shared.transition(TaskState::Cancelled).is_err() {
                    // Completed between the check and the transition.
                    return Ok(false);
                }
                self.shared.interrupt.interrupt();
                info!(task_id = %id, "Task cancelled");
                Ok(true)
            }
        }
    }

    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    pub fn is_done(&self) -> bool {
        is_terminal(self.state())
    }

    /// Wait until the task is completed or cancelled.
    ///
    /// A cancelled task reaches its terminal state before the computation has
    /// wound down; use [`join`](Self::join) to wait for that.
    pub async fn await_terminal(&self) -> TaskState {
        let mut rx = self.shared.state.subscribe();
        let terminal = rx.wait_for(|state| is_terminal(*state)).await.map(|state| *state);
        terminal.unwrap_or_else(|_| self.state())
    }

    /// Wait until the computation has exited and its last notification has
    /// been posted. Returns immediately for a task that was never started.
    pub async fn join(&self) {
        if self.state() == TaskState::NotStarted {
            return;
        }
        let mut rx = self.shared.exited.subscribe();
        let _ = rx.wait_for(|exited| *exited).await;
    }
}

impl<C: Computation> Drop for WorkerTask<C> {
    fn drop(&mut self) {
        // An unstarted task can never publish; nothing will come to collect it.
        if self.state() == TaskState::NotStarted {
            self.connector.unregister();
        }
    }
}

async fn run_to_exit<C: Computation>(
    computation: Arc<C>,
    ctx: TaskContext<C::Message>,
    params: C::Params,
    shared: Arc<TaskShared>,
) {
    let id = shared.id;
    debug!(task_id = %id, "Computation running");

    let outcome = AssertUnwindSafe(computation.run(&ctx, params))
        .catch_unwind()
        .await;

    let error = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(error),
        Err(payload) => Some(TaskError::Panicked(panic_message(payload.as_ref()))),
    };

    let failed = error.is_some();
    if let Some(error) = error {
        let failure = TaskFailure {
            task_id: id,
            error,
            elapsed: ctx.elapsed(),
        };
        // Logged whether or not a listener ends up seeing the notification.
        let elapsed_ms = failure.elapsed.as_millis() as u64;
        if failure.error.is_interrupted() {
            info!(task_id = %id, elapsed_ms, "Task interrupted");
        } else {
            warn!(task_id = %id, error = %failure.error, elapsed_ms, "Task failed");
        }
        match computation.failure_message(&failure) {
            Some(message) => ctx.post(message),
            None => debug!(task_id = %id, "No failure notification for this computation"),
        }
    }

    // A cancelled task stays cancelled.
    if shared.transition(TaskState::Completed).is_ok() {
        let elapsed_ms = ctx.elapsed().as_millis() as u64;
        if failed {
            debug!(task_id = %id, elapsed_ms, "Task ended after failure");
        } else {
            info!(task_id = %id, elapsed_ms, "Task completed");
        }
    }
    ctx.connector().finish();
    shared.exited.send_replace(true);
}
