//! Tokio-based dispatcher: one task on an existing runtime drains the queue.
//!
//! Jobs are synchronous closures run to completion one after another inside a
//! single task, which makes the task the one logical dispatch thread even on a
//! multi-threaded runtime.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::{Command, DispatchJob, DispatchQueue, run_job};
use crate::error::TetherError;

static NEXT_DISPATCHER_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    static ACTIVE_DISPATCHER: u64;
}

/// Dispatch queue backed by a single tokio task.
pub struct TokioDispatcher {
    id: u64,
    tx: mpsc::UnboundedSender<Command>,
}

impl TokioDispatcher {
    /// Spawn the dispatch task on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn spawn() -> Self {
        Self::spawn_on(&Handle::current())
    }

    /// Spawn the dispatch task on the given runtime.
    pub fn spawn_on(handle: &Handle) -> Self {
        let id = NEXT_DISPATCHER_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        handle.spawn(ACTIVE_DISPATCHER.scope(id, async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Run(job) => run_job(job),
                    Command::Stop => break,
                }
            }
            debug!(dispatcher = id, "Dispatch task exiting");
        }));

        Self { id, tx }
    }

    /// Stop the dispatch task after the jobs already queued have run.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Stop);
    }

    /// Wait until every job submitted before this call has run.
    pub async fn flush(&self) {
        if self.is_dispatch_thread() {
            return;
        }
        let (done_tx, done_rx) = oneshot::channel();
        let job: DispatchJob = Box::new(move || {
            let _ = done_tx.send(());
        });
        if self.submit(job).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl DispatchQueue for TokioDispatcher {
    fn submit(&self, job: DispatchJob) -> Result<(), TetherError> {
        self.tx
            .send(Command::Run(job))
            .map_err(|_| TetherError::DispatcherClosed)
    }

    fn is_dispatch_thread(&self) -> bool {
        ACTIVE_DISPATCHER
            .try_with(|active| *active == self.id)
            .unwrap_or(false)
    }
}

impl Drop for TokioDispatcher {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Stop);
    }
}
