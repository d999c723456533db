//! Task identifiers.
//!
//! A [`TaskId`] is the only piece of state an application has to carry across
//! the destruction and re-creation of a listener. It serializes as a plain
//! integer so it fits in whatever save/restore mechanism the host uses.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Process-unique identifier of a registered connector.
///
/// Zero is reserved to mean "no task" and can never be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(NonZeroU64);

impl TaskId {
    /// Rebuild an identifier from a persisted integer. Returns `None` for zero.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(TaskId)
    }

    /// The integer form, suitable for persisting.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

impl From<TaskId> for u64 {
    fn from(id: TaskId) -> Self {
        id.get()
    }
}
