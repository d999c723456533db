//! # Progress Dialog Demo
//!
//! A long-running computation reports progress to a "dialog" that is torn
//! down and rebuilt halfway through, the way a UI recreates its views on a
//! configuration change. The dialog only keeps the task id across the
//! rebuild; the new dialog finds the task through the registry and receives
//! the latest progress as soon as it attaches.
//!
//! ## Usage
//! ```bash
//! cargo run -p progress-demo -- --rotate-at 30
//! cargo run -p progress-demo -- --connector proxy --executor pool --cancel-at 60
//! cargo run -p progress-demo -- --fail-at 20
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tether::prelude::*;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExecutorKind {
    /// A dedicated thread per task
    Thread,
    /// The shared tokio worker pool
    Pool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConnectorKind {
    /// The computation builds notifications itself
    Manual,
    /// The computation calls the generated proxy
    Proxy,
}

#[derive(Parser)]
#[command(name = "progress-demo")]
#[command(about = "Background task surviving the replacement of its progress dialog")]
struct Args {
    #[arg(long, value_enum, default_value = "thread")]
    executor: ExecutorKind,

    #[arg(long, value_enum, default_value = "manual")]
    connector: ConnectorKind,

    /// Number of work steps
    #[arg(long, default_value = "100")]
    steps: u32,

    /// Pause after each step, in milliseconds
    #[arg(long, default_value = "80")]
    sleep_ms: u64,

    /// Rebuild the dialog once progress reaches this percentage
    #[arg(long)]
    rotate_at: Option<u32>,

    /// Cancel the task once progress reaches this percentage
    #[arg(long)]
    cancel_at: Option<u32>,

    /// Make the dialog reject the first progress update at or above this percentage
    #[arg(long)]
    fail_at: Option<u32>,
}

#[tether::listener]
pub trait ProgressView: Listener {
    fn publish_progress(&self, percent: u32) -> Result<(), DialogError>;
    fn publish_result(&self, elapsed: Duration);
    fn publish_failure(&self, elapsed: Duration, error: TaskError);
}

#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("Dialog {dialog} refused progress {percent}%")]
    Refused { dialog: u32, percent: u32 },
}

/// What the dialogs report back to the driver loop.
#[derive(Debug)]
enum DialogEvent {
    Progress { dialog: u32, percent: u32 },
    Finished { dialog: u32, elapsed: Duration },
    Failed { dialog: u32, elapsed: Duration, error: TaskError },
}

/// Stand-in for a progress dialog: shows updates and forwards them to the
/// driver loop.
struct Dialog {
    generation: u32,
    fail_at: Option<u32>,
    refused: AtomicBool,
    events: mpsc::UnboundedSender<DialogEvent>,
}

impl Dialog {
    fn new(generation: u32, fail_at: Option<u32>, events: mpsc::UnboundedSender<DialogEvent>) -> Self {
        Self {
            generation,
            fail_at,
            refused: AtomicBool::new(false),
            events,
        }
    }

    fn emit(&self, event: DialogEvent) {
        let _ = self.events.send(event);
    }
}

impl Listener for Dialog {
    fn error_handler(&self) -> Option<&dyn ErrorHandler> {
        Some(self)
    }
}

impl ErrorHandler for Dialog {
    fn handle_error(&self, error: ListenerError) {
        warn!(dialog = self.generation, operation = error.tag(), %error, "Dialog reported an error");
    }
}

impl ProgressView for Dialog {
    fn publish_progress(&self, percent: u32) -> Result<(), DialogError> {
        if self.fail_at.is_some_and(|at| percent >= at) && !self.refused.swap(true, Ordering::SeqCst) {
            return Err(DialogError::Refused {
                dialog: self.generation,
                percent,
            });
        }
        info!(dialog = self.generation, percent, "Progress");
        self.emit(DialogEvent::Progress {
            dialog: self.generation,
            percent,
        });
        Ok(())
    }

    fn publish_result(&self, elapsed: Duration) {
        info!(dialog = self.generation, elapsed_ms = elapsed.as_millis() as u64, "Finished");
        self.emit(DialogEvent::Finished {
            dialog: self.generation,
            elapsed,
        });
    }

    fn publish_failure(&self, elapsed: Duration, error: TaskError) {
        warn!(dialog = self.generation, elapsed_ms = elapsed.as_millis() as u64, %error, "Failed");
        self.emit(DialogEvent::Failed {
            dialog: self.generation,
            elapsed,
            error,
        });
    }
}

/// Work plan handed to the computation.
#[derive(Debug, Clone, Copy)]
struct Plan {
    steps: u32,
    pause: Duration,
}

impl Plan {
    fn percent(&self, step: u32) -> u32 {
        let percent = u64::from(step) * 100 / u64::from(self.steps.max(1));
        u32::try_from(percent).unwrap_or(100)
    }
}

/// Posts notifications by building them directly.
struct ManualWork;

#[async_trait]
impl Computation for ManualWork {
    type Params = Plan;
    type Message = ProgressViewMessage;

    async fn run(&self, ctx: &TaskContext<Self::Message>, plan: Plan) -> Result<(), TaskError> {
        for step in 0..plan.steps {
            ctx.post(ProgressViewMessage::PublishProgress {
                percent: plan.percent(step),
            });
            ctx.sleep(plan.pause).await?;
        }
        ctx.post(ProgressViewMessage::PublishResult {
            elapsed: ctx.elapsed(),
        });
        Ok(())
    }

    fn failure_message(&self, failure: &TaskFailure) -> Option<Self::Message> {
        Some(ProgressViewMessage::PublishFailure {
            elapsed: failure.elapsed,
            error: failure.error.clone(),
        })
    }
}

/// Calls the listener operations through the generated proxy.
struct ProxyWork;

#[async_trait]
impl Computation for ProxyWork {
    type Params = Plan;
    type Message = ProgressViewMessage;

    async fn run(&self, ctx: &TaskContext<Self::Message>, plan: Plan) -> Result<(), TaskError> {
        let view = ProgressViewProxy::new(ctx.connector().clone());
        for step in 0..plan.steps {
            let _ = view.publish_progress(plan.percent(step));
            ctx.sleep(plan.pause).await?;
        }
        view.publish_result(ctx.elapsed());
        Ok(())
    }

    fn failure_message(&self, failure: &TaskFailure) -> Option<Self::Message> {
        Some(ProgressViewMessage::PublishFailure {
            elapsed: failure.elapsed,
            error: failure.error.clone(),
        })
    }
}

/// The only state a dialog persists across a rebuild.
#[derive(Debug, Serialize, Deserialize)]
struct SavedState {
    task_id: TaskId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tether=debug")),
        )
        .init();

    let args = Args::parse();
    let plan = Plan {
        steps: args.steps,
        pause: Duration::from_millis(args.sleep_ms),
    };

    match args.connector {
        ConnectorKind::Manual => drive(ManualWork, plan, &args).await,
        ConnectorKind::Proxy => drive(ProxyWork, plan, &args).await,
    }
}

async fn drive<C>(computation: C, plan: Plan, args: &Args) -> anyhow::Result<()>
where
    C: Computation<Params = Plan, Message = ProgressViewMessage>,
{
    let registry = TaskRegistry::new();
    let dispatcher = Arc::new(ThreadDispatcher::with_config(
        DispatcherConfig::default().with_thread_name("ui"),
    )?);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let task = WorkerTask::new(&registry, dispatcher.clone(), computation)?;
    let mut generation = 1;
    task.set_listener(Some(Arc::new(Dialog::new(generation, args.fail_at, events_tx.clone()))));

    match args.executor {
        ExecutorKind::Thread => task.execute(plan)?,
        ExecutorKind::Pool => task.execute_on(&TokioTaskExecutor::current(), plan)?,
    }
    info!(task_id = %task.id(), executor = ?args.executor, connector = ?args.connector, "Task started");

    let mut rotated = false;
    let mut cancelled = false;

    while let Some(event) = events_rx.recv().await {
        match event {
            DialogEvent::Progress { dialog, percent } => {
                // Stragglers from a dismissed dialog.
                if dialog != generation {
                    continue;
                }
                if !rotated && args.rotate_at.is_some_and(|at| percent >= at) {
                    rotated = true;
                    generation += 1;
                    rebuild_dialog(&registry, &task, generation, args, plan, &events_tx).await?;
                }
                if !cancelled && args.cancel_at.is_some_and(|at| percent >= at) {
                    cancelled = task.cancel(true)?;
                    info!(cancelled, "Cancel requested");
                }
            }
            DialogEvent::Finished { dialog, elapsed } => {
                info!(dialog, elapsed_ms = elapsed.as_millis() as u64, "Task delivered its result");
                break;
            }
            DialogEvent::Failed { dialog, elapsed, error } => {
                info!(dialog, elapsed_ms = elapsed.as_millis() as u64, %error, "Task delivered a failure");
                break;
            }
        }
    }

    task.join().await;
    dispatcher.flush();
    info!(
        state = ?task.state(),
        registry_entries = registry.len(),
        "Done"
    );
    Ok(())
}

/// Dismiss the current dialog, let a few notifications pile up, then restore
/// a fresh dialog from the saved task id.
async fn rebuild_dialog<C>(
    registry: &TaskRegistry,
    task: &WorkerTask<C>,
    generation: u32,
    args: &Args,
    plan: Plan,
    events: &mpsc::UnboundedSender<DialogEvent>,
) -> anyhow::Result<()>
where
    C: Computation<Params = Plan, Message = ProgressViewMessage>,
{
    let saved = serde_json::to_string(&SavedState { task_id: task.id() })?;
    task.set_listener(None);
    info!(%saved, "Dialog dismissed");

    tokio::time::sleep(plan.pause * 3).await;

    let restored: SavedState = serde_json::from_str(&saved)?;
    match registry.lookup::<ProgressViewMessage>(restored.task_id) {
        Some(connector) => {
            connector.attach(Arc::new(Dialog::new(generation, args.fail_at, events.clone())));
            info!(task_id = %restored.task_id, dialog = generation, "Dialog restored");
        }
        None => warn!(task_id = %restored.task_id, "Task is gone; nothing to restore"),
    }
    Ok(())
}
