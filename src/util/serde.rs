//! Serializable identifiers and scheduling primitives shared across modules.

use serde::{Deserialize, Serialize};

/// Identifier assigned to every admitted task.
pub type TaskId = uuid::Uuid;

/// Dispatch priority band.
///
/// `High` items always take the next free dispatch slot ahead of `Low` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work (captions, curation, prefetch).
    #[default]
    Low,
    /// User-facing work that should jump the queue.
    High,
}

impl Priority {
    /// Lowercase label used in log messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate a fresh task identifier.
pub fn new_task_id() -> TaskId {
    uuid::Uuid::new_v4()
}
