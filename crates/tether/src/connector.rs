//! Connector: routes worker notifications to an optional, swappable listener.
//!
//! Every delivery decision is made on the dispatch thread:
//!
//! ```text
//! worker thread                 dispatch thread
//! ─────────────                 ───────────────
//! post(msg) ──submit job──►  listener attached? ── yes ──► listener.op(args)
//!                                   │                        │ error / panic
//!                                   no                       ▼
//!                                   ▼                  error_handler()? ── else ──► log
//!                            pending = msg (latest wins)
//!
//! set_listener(L) ──(hand-off unless already on dispatch thread)──►
//!     current = L; flush pending to L
//! ```
//!
//! The slot lock is only held while reading or swapping the listener and the
//! pending notification, never while a listener operation runs.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::dispatch::{DispatchJob, DispatchQueue};
use crate::error::{ListenerError, TetherError, panic_message};
use crate::ids::TaskId;
use crate::listener::{Listener, Notification};
use crate::registry::{TaskRegistry, WeakRegistry};

struct Slot<M: Notification> {
    listener: Option<Arc<M::Target>>,
    pending: Option<M>,
    finished: bool,
}

struct ConnectorInner<M: Notification> {
    id: TaskId,
    queue: Arc<dyn DispatchQueue>,
    registry: WeakRegistry,
    slot: Mutex<Slot<M>>,
}

/// Connects one worker to whichever listener is currently attached.
///
/// Cheap to clone; clones share the listener slot and the pending buffer.
pub struct Connector<M: Notification> {
    inner: Arc<ConnectorInner<M>>,
}

impl<M: Notification> Clone for Connector<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Notification> Connector<M> {
    /// Create a connector and register it under a fresh [`TaskId`].
    pub fn new(registry: &TaskRegistry, queue: Arc<dyn DispatchQueue>) -> Result<Self, TetherError> {
        let id = registry.next_id();
        let connector = Self {
            inner: Arc::new(ConnectorInner {
                id,
                queue,
                registry: registry.downgrade(),
                slot: Mutex::new(Slot {
                    listener: None,
                    pending: None,
                    finished: false,
                }),
            }),
        };
        registry.insert(&connector)?;

        debug!(task_id = %id, "Registered connector");
        Ok(connector)
    }

    /// The identifier a recreated listener uses to find this connector again.
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// Queue `message` for delivery. Callable from any thread; never blocks.
    ///
    /// If the dispatch queue has shut down the notification is logged and
    /// dropped.
    pub fn post(&self, message: M) {
        let tag = message.tag();
        let inner = Arc::clone(&self.inner);
        let job: DispatchJob = Box::new(move || inner.deliver_or_buffer(message));
        if let Err(e) = self.inner.queue.submit(job) {
            warn!(task_id = %self.inner.id, tag, error = %e, "Dropping notification");
        }
    }

    /// Install `listener` as current, or detach when `None`.
    ///
    /// A buffered notification is flushed to the new listener. On the
    /// dispatch thread this happens before returning; elsewhere the change is
    /// handed off through the queue so it is ordered after every notification
    /// posted before this call.
    pub fn set_listener(&self, listener: Option<Arc<M::Target>>) {
        if self.inner.queue.is_dispatch_thread() {
            self.inner.install(listener);
            return;
        }

        let inner = Arc::clone(&self.inner);
        let job: DispatchJob = Box::new(move || inner.install(listener));
        if let Err(e) = self.inner.queue.submit(job) {
            warn!(task_id = %self.inner.id, error = %e, "Could not hand off listener change");
        }
    }

    /// Attach `listener`; shorthand for `set_listener(Some(listener))`.
    pub fn attach(&self, listener: Arc<M::Target>) {
        self.set_listener(Some(listener));
    }

    /// Detach the current listener. Later notifications are buffered, latest wins.
    pub fn remove_listener(&self) {
        self.set_listener(None);
    }

    pub fn has_listener(&self) -> bool {
        self.inner.slot.lock().listener.is_some()
    }

    /// Whether a notification is buffered waiting for a listener.
    pub fn has_pending(&self) -> bool {
        self.inner.slot.lock().pending.is_some()
    }

    /// Remove this connector from the registry it was created in.
    pub(crate) fn unregister(&self) {
        self.inner.registry.evict(self.inner.id);
    }

    /// Mark the producing task as finished.
    ///
    /// Queued behind every notification the task posted, so by the time it
    /// runs each of them has either been delivered or buffered.
    pub(crate) fn finish(&self) {
        let inner = Arc::clone(&self.inner);
        let job: DispatchJob = Box::new(move || inner.mark_finished());
        if let Err(e) = self.inner.queue.submit(job) {
            warn!(task_id = %self.inner.id, error = %e, "Could not queue task completion");
        }
    }
}

impl<M: Notification> ConnectorInner<M> {
    fn deliver_or_buffer(&self, message: M) {
        let mut slot = self.slot.lock();
        let Some(listener) = slot.listener.clone() else {
            debug!(task_id = %self.id, tag = message.tag(), "No listener attached; buffering notification");
            let displaced = slot.pending.replace(message);
            drop(slot);
            if let Some(previous) = displaced {
                debug!(task_id = %self.id, dropped = previous.tag(), "Replaced buffered notification");
            }
            return;
        };
        drop(slot);

        self.deliver(&listener, message);
    }

    fn install(&self, listener: Option<Arc<M::Target>>) {
        let (flush, evict, previous) = {
            let mut slot = self.slot.lock();
            let previous = std::mem::replace(&mut slot.listener, listener.clone());
            match listener {
                Some(listener) => (
                    slot.pending.take().map(|m| (listener, m)),
                    slot.finished,
                    previous,
                ),
                None => (None, false, previous),
            }
        };
        drop(previous);

        match &flush {
            Some((_, message)) => {
                debug!(task_id = %self.id, tag = message.tag(), "Listener attached; flushing buffered notification")
            }
            None => debug!(task_id = %self.id, "Listener changed"),
        }

        if let Some((listener, message)) = flush {
            self.deliver(&listener, message);
        }
        if evict {
            self.registry.evict(self.id);
        }
    }

    fn mark_finished(&self) {
        let attached = {
            let mut slot = self.slot.lock();
            slot.finished = true;
            slot.listener.is_some()
        };
        if attached {
            self.registry.evict(self.id);
        }
    }

    fn deliver(&self, listener: &Arc<M::Target>, message: M) {
        let tag = message.tag();
        let target: &M::Target = listener;

        let outcome = match catch_unwind(AssertUnwindSafe(|| message.dispatch(target))) {
            Ok(result) => result,
            Err(payload) => Err(ListenerError::Panicked {
                tag,
                message: panic_message(payload.as_ref()),
            }),
        };

        if let Err(err) = outcome {
            self.route_error(target, err);
        }
    }

    fn route_error(&self, listener: &M::Target, err: ListenerError) {
        let Some(handler) = listener.error_handler() else {
            error!(
                task_id = %self.id,
                tag = err.tag(),
                error = %err,
                "Listener operation failed and the listener has no error handler"
            );
            return;
        };

        let tag = err.tag();
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler.handle_error(err))) {
            error!(
                task_id = %self.id,
                tag,
                panic = %panic_message(payload.as_ref()),
                "Listener error handler panicked"
            );
        }
    }
}
