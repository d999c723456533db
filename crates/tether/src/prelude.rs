//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use tether::prelude::*;
//! ```

pub use crate::config::{DispatcherConfig, RegistryConfig, TaskConfig};
pub use crate::connector::Connector;
pub use crate::dispatch::{DispatchQueue, ThreadDispatcher, TokioDispatcher};
pub use crate::error::{ListenerError, TaskError, TetherError};
pub use crate::ids::TaskId;
pub use crate::listener::{ErrorHandler, Listener, Notification};
pub use crate::registry::TaskRegistry;
pub use crate::task::{
    Computation, TaskContext, TaskExecutor, TaskFailure, TaskState, ThreadExecutor,
    TokioTaskExecutor, WorkerTask,
};
