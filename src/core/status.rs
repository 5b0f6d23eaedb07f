//! Read-only governor snapshots for UIs and diagnostics.

use serde::{Deserialize, Serialize};

/// Lifetime totals kept by the governor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorCounters {
    /// Submissions admitted into the queue.
    pub submitted: u64,
    /// Attempts started (retries count again).
    pub dispatched: u64,
    /// Tasks that resolved with a value.
    pub succeeded: u64,
    /// Tasks that resolved with an error.
    pub failed: u64,
    /// Quota failures that were scheduled for another attempt.
    pub retried: u64,
    /// Submissions short-circuited as duplicate keys.
    pub skipped: u64,
    /// Submissions refused (queue full or shut down).
    pub rejected: u64,
}

/// Point-in-time view of the governor, cheap and side-effect free to take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorStatus {
    /// Whether dispatch is suspended by a quota cooldown.
    pub is_quarantined: bool,
    /// Milliseconds left in the cooldown (0 when not quarantined).
    pub remaining_ms: u64,
    /// Current adaptive requests-per-minute ceiling.
    pub current_rpm: u32,
    /// Minimum spacing between dispatches at the current ceiling.
    pub dispatch_interval_ms: u64,
    /// Tasks in flight.
    pub active_requests: usize,
    /// Configured in-flight limit.
    pub max_concurrent: usize,
    /// Tasks waiting in the admission queue.
    pub queued: usize,
    /// Tasks waiting out a retry backoff before re-entering the queue.
    pub backing_off: usize,
    /// Consecutive successes since the last ceiling change.
    pub success_streak: u32,
    /// Whether the dispatch loop is running.
    pub is_processing: bool,
    /// Lifetime totals.
    pub counters: GovernorCounters,
}

impl GovernorStatus {
    /// One-line summary suitable for a cooldown banner.
    pub fn banner(&self) -> String {
        if self.is_quarantined {
            format!(
                "Cooling down: {}s remaining ({} RPM)",
                self.remaining_ms.div_ceil(1000),
                self.current_rpm
            )
        } else {
            format!(
                "{} RPM, {}/{} active, {} queued",
                self.current_rpm, self.active_requests, self.max_concurrent, self.queued
            )
        }
    }
}
