//! What a running computation sees of its task.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::connector::Connector;
use crate::error::TaskError;
use crate::ids::TaskId;
use crate::listener::Notification;
use crate::task::interrupt::InterruptSignal;

/// Handle passed to [`Computation::run`](crate::task::Computation::run).
///
/// Publishing goes through [`post`](Self::post) or through a generated proxy
/// built from [`connector`](Self::connector). Waits that should end early on
/// `cancel(true)` go through [`sleep`](Self::sleep) or
/// [`interruptible`](Self::interruptible).
pub struct TaskContext<M: Notification> {
    connector: Connector<M>,
    interrupt: InterruptSignal,
    started: Instant,
}

impl<M: Notification> TaskContext<M> {
    pub(crate) fn new(connector: Connector<M>, interrupt: InterruptSignal) -> Self {
        Self {
            connector,
            interrupt,
            started: Instant::now(),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.connector.id()
    }

    pub fn connector(&self) -> &Connector<M> {
        &self.connector
    }

    /// Publish a notification to whichever listener is attached.
    pub fn post(&self, message: M) {
        self.connector.post(message);
    }

    /// Time since the computation started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_interrupted()
    }

    /// `Err(Interrupted)` once the task has been cancelled with interruption.
    pub fn checkpoint(&self) -> Result<(), TaskError> {
        if self.is_interrupted() {
            Err(TaskError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, returning `Err(Interrupted)` as soon as the task
    /// is interrupted.
    pub async fn sleep(&self, duration: Duration) -> Result<(), TaskError> {
        self.interruptible(tokio::time::sleep(duration)).await
    }

    /// Await `future` unless the task is interrupted first.
    ///
    /// An interruption raised before the call wins even if `future` is
    /// already complete.
    pub async fn interruptible<F: Future>(&self, future: F) -> Result<F::Output, TaskError> {
        tokio::select! {
            biased;
            _ = self.interrupt.interrupted() => Err(TaskError::Interrupted),
            output = future => Ok(output),
        }
    }
}
