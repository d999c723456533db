//! Task Registry: rediscovery of in-flight connectors by [`TaskId`].
//!
//! The registry is an explicit object created at startup and handed to
//! whatever constructs tasks. It keeps each connector alive until one of:
//!
//! - the task reached a terminal state and its final notification was handed
//!   to an attached listener (the connector evicts itself),
//! - the task was dropped without ever being executed,
//! - the application calls [`TaskRegistry::release`].
//!
//! Entries are stored type-erased; [`TaskRegistry::lookup`] recovers the
//! typed connector for the caller's notification type.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::connector::Connector;
use crate::error::TetherError;
use crate::ids::TaskId;
use crate::listener::Notification;

type Entry = Arc<dyn Any + Send + Sync>;

struct RegistryInner {
    next_id: AtomicU64,
    entries: RwLock<HashMap<TaskId, Entry>>,
    config: RegistryConfig,
}

/// Process-wide mapping from task identifier to live connector.
///
/// Cheap to clone; clones share the same entries and id counter.
#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<RegistryInner>,
}

impl TaskRegistry {
    /// Create a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicU64::new(0),
                entries: RwLock::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Allocate a fresh identifier. Identifiers start at 1 and are never reused.
    pub(crate) fn next_id(&self) -> TaskId {
        let raw = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        match TaskId::from_raw(raw) {
            Some(id) => id,
            // u64 wrap-around is unreachable in practice; skip the reserved zero.
            None => self.next_id(),
        }
    }

    /// Store `connector` under its identifier.
    pub(crate) fn insert<M: Notification>(
        &self,
        connector: &Connector<M>,
    ) -> Result<(), TetherError> {
        let mut entries = self.inner.entries.write();

        let max = self.inner.config.max_entries;
        if max > 0 && entries.len() >= max {
            warn!(task_id = %connector.id(), max_entries = max, "Task registry is full");
            return Err(TetherError::MaxTasksReached(max));
        }

        let entry: Entry = Arc::new(connector.clone());
        entries.insert(connector.id(), entry);
        Ok(())
    }

    /// Find the connector registered under `id`.
    ///
    /// Returns `None` when the id is unknown, was released or evicted, or was
    /// registered with a different notification type.
    pub fn lookup<M: Notification>(&self, id: TaskId) -> Option<Connector<M>> {
        let entries = self.inner.entries.read();
        let entry = entries.get(&id)?;
        let connector = entry.downcast_ref::<Connector<M>>().cloned();
        if connector.is_none() {
            debug!(task_id = %id, "Registry entry has a different notification type");
        }
        connector
    }

    /// Drop the registry's reference to `id`. Returns whether it was present.
    pub fn release(&self, id: TaskId) -> bool {
        let removed = self.inner.entries.write().remove(&id);
        // Guard released above; the connector may be dropped here.
        match removed {
            Some(_) => {
                debug!(task_id = %id, "Released registry entry");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.inner.entries.read().contains_key(&id)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Back-reference held by connectors so they can evict themselves without
/// keeping the registry alive.
pub(crate) struct WeakRegistry {
    inner: Weak<RegistryInner>,
}

impl WeakRegistry {
    /// Remove `id` if the registry still exists.
    ///
    /// The removed entry is dropped after the lock is released, since it may
    /// hold the last reference to a connector.
    pub(crate) fn evict(&self, id: TaskId) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let removed = inner.entries.write().remove(&id);
        if removed.is_some() {
            debug!(task_id = %id, "Evicted task from registry");
        }
    }
}
