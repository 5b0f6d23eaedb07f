//! At-most-one-live-task-per-key guard.

use std::collections::HashSet;

/// Tracks the deduplication keys currently owned by a live task.
///
/// A key is claimed at admission and held until the owning task resolves,
/// including while it waits in the queue or in retry backoff.
#[derive(Debug, Clone, Default)]
pub struct DedupGuard {
    keys: HashSet<String>,
}

impl DedupGuard {
    /// Claim `key`; returns `false` if another live task already owns it.
    pub fn claim(&mut self, key: &str) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        self.keys.insert(key.to_owned())
    }

    /// Release `key` so a new task may claim it.
    pub fn release(&mut self, key: &str) -> bool {
        self.keys.remove(key)
    }

    /// Whether `key` is currently owned.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Number of owned keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key is owned.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
