//! Adaptive RPM pacing and the global quota quarantine.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::GovernorConfig;

/// What a successful completion did to the RPM ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpmChange {
    /// Streak grew, ceiling unchanged.
    Unchanged,
    /// Streak completed and the ceiling rose to the contained value.
    Raised(u32),
}

/// Converts the adaptive requests-per-minute ceiling into dispatch spacing.
///
/// Recovery is additive and slow (one step per full success streak), the
/// cutback on a quota error is multiplicative (halving).
#[derive(Debug, Clone)]
pub struct PacingController {
    current_rpm: u32,
    min_rpm: u32,
    max_rpm: u32,
    recovery_step: u32,
    streak_threshold: u32,
    success_streak: u32,
    last_dispatch: Option<Instant>,
}

impl PacingController {
    /// Build from governor configuration.
    ///
    /// An inverted `min_rpm`/`max_rpm` pair collapses to `max_rpm`.
    pub fn new(cfg: &GovernorConfig) -> Self {
        let max_rpm = cfg.max_rpm.max(1);
        let min_rpm = cfg.min_rpm.clamp(1, max_rpm);
        Self {
            current_rpm: cfg.initial_rpm.clamp(min_rpm, max_rpm),
            min_rpm,
            max_rpm,
            recovery_step: cfg.rpm_recovery_step,
            streak_threshold: cfg.success_streak_threshold.max(1),
            success_streak: 0,
            last_dispatch: None,
        }
    }

    /// Current RPM ceiling.
    pub const fn current_rpm(&self) -> u32 {
        self.current_rpm
    }

    /// Consecutive successes since the last ceiling change.
    pub const fn success_streak(&self) -> u32 {
        self.success_streak
    }

    /// Minimum spacing between two dispatches: `ceil(60000 / rpm)` ms.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(60_000u64.div_ceil(u64::from(self.current_rpm.max(1))))
    }

    /// Earliest instant the next dispatch may start.
    pub fn next_dispatch_at(&self) -> Option<Instant> {
        self.last_dispatch.map(|t| t + self.interval())
    }

    /// Whether enough time has passed since the last dispatch.
    pub fn ready(&self, now: Instant) -> bool {
        self.next_dispatch_at().is_none_or(|at| now >= at)
    }

    /// Record that a dispatch started at `now`.
    pub fn record_dispatch(&mut self, now: Instant) {
        self.last_dispatch = Some(now);
    }

    /// Record a successful completion, raising the ceiling after a full streak.
    pub fn record_success(&mut self) -> RpmChange {
        self.success_streak += 1;
        if self.success_streak < self.streak_threshold {
            return RpmChange::Unchanged;
        }
        self.success_streak = 0;
        let raised = self
            .current_rpm
            .saturating_add(self.recovery_step)
            .min(self.max_rpm);
        if raised == self.current_rpm {
            return RpmChange::Unchanged;
        }
        self.current_rpm = raised;
        RpmChange::Raised(raised)
    }

    /// Halve the ceiling after a quota error (floored at `min_rpm`) and reset the streak.
    ///
    /// Returns the new ceiling.
    pub fn record_quota_error(&mut self) -> u32 {
        self.success_streak = 0;
        self.current_rpm = (self.current_rpm / 2).max(self.min_rpm);
        self.current_rpm
    }
}

/// Global cooldown window; while active nothing is dispatched.
#[derive(Debug, Clone, Default)]
pub struct Quarantine {
    until: Option<Instant>,
}

impl Quarantine {
    /// End of the current window, if one was ever set.
    pub const fn until(&self) -> Option<Instant> {
        self.until
    }

    /// Whether dispatch is suspended at `now`.
    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    /// Time left in the window (zero when inactive).
    pub fn remaining(&self, now: Instant) -> Duration {
        self.until
            .map_or(Duration::ZERO, |until| until.saturating_duration_since(now))
    }

    /// Extend the window to `now + window`; an existing longer window is kept.
    ///
    /// Returns the resulting end of the window.
    pub fn extend(&mut self, now: Instant, window: Duration) -> Instant {
        let candidate = now + window;
        let until = self.until.map_or(candidate, |current| current.max(candidate));
        self.until = Some(until);
        until
    }
}
