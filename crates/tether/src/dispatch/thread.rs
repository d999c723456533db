//! Thread-based dispatcher: a dedicated OS thread standing in for a UI loop.

use std::sync::mpsc as std_mpsc;
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tracing::debug;

use super::{Command, DispatchJob, DispatchQueue, run_job};
use crate::config::DispatcherConfig;
use crate::error::TetherError;

/// Dispatch queue backed by one dedicated thread draining an unbounded channel.
///
/// The thread exits once the dispatcher is dropped or [`shutdown`] is called;
/// jobs submitted afterwards are rejected with [`TetherError::DispatcherClosed`].
///
/// [`shutdown`]: ThreadDispatcher::shutdown
pub struct ThreadDispatcher {
    tx: mpsc::UnboundedSender<Command>,
    thread_id: ThreadId,
}

impl ThreadDispatcher {
    /// Start a dispatcher with the default configuration.
    pub fn start() -> Result<Self, TetherError> {
        Self::with_config(DispatcherConfig::default())
    }

    /// Start a dispatcher thread with custom configuration.
    pub fn with_config(config: DispatcherConfig) -> Result<Self, TetherError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                while let Some(command) = rx.blocking_recv() {
                    match command {
                        Command::Run(job) => run_job(job),
                        Command::Stop => break,
                    }
                }
                debug!("Dispatch thread exiting");
            })
            .map_err(TetherError::DispatcherSpawn)?;

        debug!(thread = %config.thread_name, "Started dispatch thread");

        Ok(Self {
            tx,
            thread_id: handle.thread().id(),
        })
    }

    /// Stop the dispatch thread after the jobs already queued have run.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Stop);
    }

    /// Block until every job submitted before this call has run.
    ///
    /// Returns immediately when called on the dispatch thread itself or when
    /// the dispatcher has stopped.
    pub fn flush(&self) {
        if self.is_dispatch_thread() {
            return;
        }
        let (done_tx, done_rx) = std_mpsc::channel();
        let job: DispatchJob = Box::new(move || {
            let _ = done_tx.send(());
        });
        if self.submit(job).is_ok() {
            let _ = done_rx.recv();
        }
    }
}

impl DispatchQueue for ThreadDispatcher {
    fn submit(&self, job: DispatchJob) -> Result<(), TetherError> {
        self.tx
            .send(Command::Run(job))
            .map_err(|_| TetherError::DispatcherClosed)
    }

    fn is_dispatch_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Drop for ThreadDispatcher {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Stop);
    }
}
