//! Configuration structs for the registry, dispatchers and worker tasks.

/// Configuration for a [`TaskRegistry`](crate::TaskRegistry).
///
/// A task that finishes while no listener is attached keeps its entry so a
/// later listener can still collect the final notification. If nothing ever
/// reattaches, the entry stays until [`release`](crate::TaskRegistry::release)
/// is called; once `max_entries` such entries pile up, creating a task fails
/// with [`MaxTasksReached`](crate::TetherError::MaxTasksReached).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum number of live entries (0 = unlimited)
    pub max_entries: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_entries: 10_000 }
    }
}

/// Configuration for the reference dispatchers.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Name given to the dispatch thread (thread dispatcher only)
    pub thread_name: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: "tether-dispatch".to_string(),
        }
    }
}

impl DispatcherConfig {
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// Configuration for a [`WorkerTask`](crate::WorkerTask).
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Prefix of dedicated worker thread names; the task id is appended
    pub thread_name_prefix: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "tether-worker".to_string(),
        }
    }
}

impl TaskConfig {
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}
