//! Test Helpers Module for Tether Integration Tests
//!
//! Shared listener shape, a recording listener, a step-counting computation
//! in both publishing styles (direct messages and proxy calls), and in-memory
//! log capture.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tether::prelude::*;
use tracing_subscriber::fmt::MakeWriter;

/// Listener shape used across the integration tests.
#[tether::listener]
pub trait ProgressView: Listener {
    fn publish_progress(&self, step: u32) -> Result<(), Rejected>;
    fn publish_result(&self, elapsed: Duration);
    fn publish_failure(&self, elapsed: Duration, error: TaskError);
}

#[derive(Debug, thiserror::Error)]
#[error("progress {0} rejected")]
pub struct Rejected(pub u32);

/// One delivered listener call, as observed by a [`Recorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Progress(u32),
    Result(Duration),
    Failure(TaskError),
}

/// Listener that records everything it receives.
#[derive(Default)]
pub struct Recorder {
    seen: Mutex<Vec<Seen>>,
    errors: Mutex<Vec<String>>,
    reject_step: Option<u32>,
    handles_errors: bool,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A recorder that rejects `step` and reports the failure to itself.
    pub fn rejecting(step: u32) -> Arc<Self> {
        Arc::new(Self {
            reject_step: Some(step),
            handles_errors: true,
            ..Self::default()
        })
    }

    /// A recorder that rejects `step` and has no error handler.
    pub fn rejecting_unhandled(step: u32) -> Arc<Self> {
        Arc::new(Self {
            reject_step: Some(step),
            ..Self::default()
        })
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    pub fn progress(&self) -> Vec<u32> {
        self.seen
            .lock()
            .iter()
            .filter_map(|s| match s {
                Seen::Progress(step) => Some(*step),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl Listener for Recorder {
    fn error_handler(&self) -> Option<&dyn ErrorHandler> {
        if self.handles_errors { Some(self) } else { None }
    }
}

impl ErrorHandler for Recorder {
    fn handle_error(&self, error: ListenerError) {
        self.errors.lock().push(error.to_string());
    }
}

impl ProgressView for Recorder {
    fn publish_progress(&self, step: u32) -> Result<(), Rejected> {
        if self.reject_step == Some(step) {
            return Err(Rejected(step));
        }
        self.seen.lock().push(Seen::Progress(step));
        Ok(())
    }

    fn publish_result(&self, elapsed: Duration) {
        self.seen.lock().push(Seen::Result(elapsed));
    }

    fn publish_failure(&self, elapsed: Duration, error: TaskError) {
        let _ = elapsed;
        self.seen.lock().push(Seen::Failure(error));
    }
}

/// Reports progress 0..count, pausing between steps, then the elapsed time.
pub struct Steps {
    pub count: u32,
    pub pause: Duration,
}

impl Steps {
    pub fn new(count: u32, pause: Duration) -> Self {
        Self { count, pause }
    }
}

fn failure_notification(failure: &TaskFailure) -> ProgressViewMessage {
    ProgressViewMessage::PublishFailure {
        elapsed: failure.elapsed,
        error: failure.error.clone(),
    }
}

#[async_trait]
impl Computation for Steps {
    type Params = ();
    type Message = ProgressViewMessage;

    async fn run(&self, ctx: &TaskContext<Self::Message>, _params: ()) -> Result<(), TaskError> {
        for step in 0..self.count {
            ctx.post(ProgressViewMessage::PublishProgress { step });
            ctx.sleep(self.pause).await?;
        }
        ctx.post(ProgressViewMessage::PublishResult {
            elapsed: ctx.elapsed(),
        });
        Ok(())
    }

    fn failure_message(&self, failure: &TaskFailure) -> Option<Self::Message> {
        Some(failure_notification(failure))
    }
}

/// Same as [`Steps`], publishing through the generated proxy.
pub struct ProxySteps {
    pub count: u32,
    pub pause: Duration,
}

#[async_trait]
impl Computation for ProxySteps {
    type Params = ();
    type Message = ProgressViewMessage;

    async fn run(&self, ctx: &TaskContext<Self::Message>, _params: ()) -> Result<(), TaskError> {
        let view = ProgressViewProxy::new(ctx.connector().clone());
        for step in 0..self.count {
            view.publish_progress(step).map_err(TaskError::failed)?;
            ctx.sleep(self.pause).await?;
        }
        view.publish_result(ctx.elapsed());
        Ok(())
    }

    fn failure_message(&self, failure: &TaskFailure) -> Option<Self::Message> {
        Some(failure_notification(failure))
    }
}

/// Fails straight away with the given reason.
pub struct Failing(pub &'static str);

#[async_trait]
impl Computation for Failing {
    type Params = ();
    type Message = ProgressViewMessage;

    async fn run(&self, _ctx: &TaskContext<Self::Message>, _params: ()) -> Result<(), TaskError> {
        Err(TaskError::failed(self.0))
    }

    fn failure_message(&self, failure: &TaskFailure) -> Option<Self::Message> {
        Some(failure_notification(failure))
    }
}

/// Registry plus a thread dispatcher standing in for the UI loop.
pub struct Harness {
    pub registry: TaskRegistry,
    pub dispatcher: Arc<ThreadDispatcher>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            registry: TaskRegistry::new(),
            dispatcher: Arc::new(ThreadDispatcher::start().expect("dispatch thread")),
        }
    }

    pub fn queue(&self) -> Arc<dyn DispatchQueue> {
        self.dispatcher.clone()
    }

    pub fn task<C: Computation>(&self, computation: C) -> WorkerTask<C> {
        WorkerTask::new(&self.registry, self.queue(), computation).expect("task")
    }

    /// Wait for every delivery queued so far.
    pub fn settle(&self) {
        self.dispatcher.flush();
    }
}

/// Formatted tracing output collected in memory.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture events at `level` and above on the current thread until the guard
/// is dropped.
pub fn capture_logs(level: tracing::Level) -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(level)
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

/// Route tracing output through the test harness; set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
