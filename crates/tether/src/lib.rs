//! # Tether
//!
//! **Background tasks that outlive the UI objects observing them.**
//!
//! A worker publishes notifications through a [`Connector`]. The connector
//! delivers each one on a single dispatch thread to whichever listener is
//! attached at that moment. While no listener is attached it keeps only the
//! most recent notification and hands it to the next listener that attaches.
//! Listeners are recreated freely (a screen rotation, a reconnecting client)
//! and find their task again through the [`TaskRegistry`] by [`TaskId`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tether::prelude::*;
//!
//! #[tether::listener]
//! pub trait ProgressView: Listener {
//!     fn publish_progress(&self, percent: u32);
//!     fn publish_result(&self, elapsed: Duration);
//! }
//!
//! struct Count;
//!
//! #[async_trait::async_trait]
//! impl Computation for Count {
//!     type Params = u32;
//!     type Message = ProgressViewMessage;
//!
//!     async fn run(&self, ctx: &TaskContext<Self::Message>, steps: u32) -> Result<(), TaskError> {
//!         let view = ProgressViewProxy::new(ctx.connector().clone());
//!         for step in 0..steps {
//!             view.publish_progress(step * 100 / steps);
//!             ctx.sleep(Duration::from_millis(80)).await?;
//!         }
//!         view.publish_result(ctx.elapsed());
//!         Ok(())
//!     }
//! }
//!
//! struct Printer;
//! impl Listener for Printer {}
//! impl ProgressView for Printer {
//!     fn publish_progress(&self, percent: u32) { println!("{percent}%"); }
//!     fn publish_result(&self, elapsed: Duration) { println!("done in {elapsed:?}"); }
//! }
//!
//! # fn main() -> Result<(), TetherError> {
//! let registry = TaskRegistry::new();
//! let dispatcher = Arc::new(ThreadDispatcher::start()?);
//!
//! let task = WorkerTask::new(&registry, dispatcher.clone(), Count)?;
//! task.set_listener(Some(Arc::new(Printer)));
//! task.execute(10)?;
//!
//! // Later, after the listener was torn down and rebuilt:
//! if let Some(connector) = registry.lookup::<ProgressViewMessage>(task.id()) {
//!     connector.attach(Arc::new(Printer));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **[`Connector`]**: listener slot, single pending buffer, delivery and error routing
//! - **[`TaskRegistry`]**: rediscovery of live connectors by id
//! - **[`DispatchQueue`]**: the single-consumer context deliveries run on
//! - **[`WorkerTask`]**: single-shot computation with cancel/interrupt semantics
//! - **`#[listener]`**: generates the notification enum and posting proxy for a listener trait

extern crate self as tether;

pub mod config;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod ids;
pub mod listener;
pub mod prelude;
pub mod registry;
pub mod task;

// Re-exports for convenience
pub use config::{DispatcherConfig, RegistryConfig, TaskConfig};
pub use connector::Connector;
pub use dispatch::{DispatchJob, DispatchQueue, ThreadDispatcher, TokioDispatcher};
pub use error::{BoxError, ListenerError, TaskError, TetherError};
pub use ids::TaskId;
pub use listener::{ErrorHandler, Listener, Notification};
pub use registry::TaskRegistry;
pub use task::{
    Computation, TaskContext, TaskExecutor, TaskFailure, TaskState, ThreadExecutor,
    TokioTaskExecutor, WorkerTask,
};

pub use tether_derive::listener;
