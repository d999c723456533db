//! Worker tasks: single-shot background computations publishing through a
//! connector.
//!
//! - [`worker`]: `WorkerTask` and the `Computation` trait
//! - [`context`]: `TaskContext`, the computation's view of its task
//! - [`executor`]: where computations run (dedicated thread or tokio runtime)
//! - [`state_machine`]: lifecycle transitions
//! - [`interrupt`]: cooperative interruption

pub mod context;
pub mod executor;
pub mod interrupt;
pub mod state_machine;
pub mod worker;

pub use context::TaskContext;
pub use executor::{BoxedTaskWork, TaskExecutor, ThreadExecutor, TokioTaskExecutor};
pub use interrupt::InterruptSignal;
pub use state_machine::{TaskState, is_terminal, validate_transition};
pub use worker::{Computation, TaskFailure, WorkerTask};
