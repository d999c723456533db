//! Interrupt signal: cooperative interruption of a running computation.
//!
//! Raised by `WorkerTask::cancel(true)` and observed by the computation at
//! its interruptible waits (`TaskContext::sleep`, `TaskContext::interruptible`)
//! or when it polls `TaskContext::checkpoint`.

use tokio::sync::watch;

/// Shared interruption flag backed by a `watch` channel.
#[derive(Clone)]
pub struct InterruptSignal {
    tx: watch::Sender<bool>,
}

impl InterruptSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Raise the signal. Raising it again has no further effect.
    pub fn interrupt(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_interrupted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the signal is raised; immediately if it already was.
    pub async fn interrupted(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|raised| *raised).await;
    }
}

impl Default for InterruptSignal {
    fn default() -> Self {
        Self::new()
    }
}
