//! Counting gate on in-flight tasks.

/// Caps how many tasks may be in flight at once.
///
/// Independent of pacing: pacing decides *when* a dispatch may start, the
/// gate decides *how many* may run together. Both must allow a dispatch.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    active: usize,
    max: usize,
    peak: usize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `max` concurrent tasks.
    pub const fn new(max: usize) -> Self {
        Self {
            active: 0,
            max,
            peak: 0,
        }
    }

    /// Tasks currently in flight.
    pub const fn active(&self) -> usize {
        self.active
    }

    /// Configured limit.
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Highest number of tasks ever observed in flight together.
    pub const fn peak(&self) -> usize {
        self.peak
    }

    /// Whether a slot is free.
    pub const fn has_slot(&self) -> bool {
        self.active < self.max
    }

    /// Take a slot; returns `false` and changes nothing when the gate is full.
    pub fn try_acquire(&mut self) -> bool {
        if !self.has_slot() {
            return false;
        }
        self.active += 1;
        self.peak = self.peak.max(self.active);
        true
    }

    /// Give a slot back.
    pub fn release(&mut self) {
        debug_assert!(self.active > 0, "released a slot that was never acquired");
        self.active = self.active.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_caps_and_releases() {
        let mut gate = ConcurrencyGate::new(2);
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
        assert_eq!(gate.active(), 2);

        gate.release();
        assert!(gate.has_slot());
        assert!(gate.try_acquire());
        assert_eq!(gate.peak(), 2);
    }
}
