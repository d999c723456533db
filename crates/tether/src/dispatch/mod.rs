//! Dispatch Queue: the single-consumer context all listener calls run on.
//!
//! The connector only needs two things from the host's UI loop: a way to
//! submit a job that runs later, in submission order, on one logical thread,
//! and a way to ask whether the caller is already on that thread.
//!
//! - [`thread`]: `ThreadDispatcher`, a dedicated OS thread
//! - [`runtime`]: `TokioDispatcher`, a single tokio task

pub mod runtime;
pub mod thread;

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::error;

use crate::error::{TetherError, panic_message};

pub use self::runtime::TokioDispatcher;
pub use self::thread::ThreadDispatcher;

/// A unit of work submitted to the dispatch queue.
pub type DispatchJob = Box<dyn FnOnce() + Send + 'static>;

/// Single-consumer, order-preserving executor for listener deliveries.
pub trait DispatchQueue: Send + Sync + 'static {
    /// Run `job` later on the dispatch thread, after every previously
    /// submitted job. Never blocks.
    fn submit(&self, job: DispatchJob) -> Result<(), TetherError>;

    /// Whether the caller is currently running on the dispatch thread.
    fn is_dispatch_thread(&self) -> bool;
}

pub(crate) enum Command {
    Run(DispatchJob),
    Stop,
}

/// Run one job, containing any panic so the consumer loop keeps going.
pub(crate) fn run_job(job: DispatchJob) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
        error!(
            panic = %panic_message(payload.as_ref()),
            "Dispatch job panicked; continuing with the next job"
        );
    }
}
