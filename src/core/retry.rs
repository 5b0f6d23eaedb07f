//! Retry policy: decides backoff delays for quota-limited tasks.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Exponential backoff with symmetric jitter and a bounded retry budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Quota retries allowed before giving up.
    pub max_retries: u32,
    /// Base delay; the first retry waits twice this.
    pub initial_delay: Duration,
    /// Cap on the jitter-free delay.
    pub max_delay: Duration,
    /// Jitter fraction applied symmetrically around the delay.
    pub jitter_factor: f64,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            jitter_factor: cfg.jitter_factor.clamp(0.0, 0.99),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Whether a task that has now failed `retries` times must give up.
    pub const fn exhausted(&self, retries: u32) -> bool {
        retries > self.max_retries
    }

    /// Jitter-free delay: `min(max_delay, initial_delay * 2^retries)`.
    pub fn base_delay(&self, retries: u32) -> Duration {
        let factor = 2u32.checked_pow(retries).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Delay with jitter from a sample in `[-1, 1]`.
    ///
    /// `-1` yields the lowest delay, `1` the highest.
    pub fn delay_with_sample(&self, retries: u32, sample: f64) -> Duration {
        let base = self.base_delay(retries).as_secs_f64();
        let scale = self.jitter_factor.mul_add(sample.clamp(-1.0, 1.0), 1.0);
        Duration::from_secs_f64((base * scale).max(0.0))
    }

    /// Delay for the given retry count with random jitter.
    pub fn next_delay(&self, retries: u32) -> Duration {
        let sample = rand::rng().random_range(-1.0..=1.0);
        self.delay_with_sample(retries, sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            jitter_factor: 0.2,
        }
    }

    #[test]
    fn base_delay_doubles_then_caps() {
        let p = policy();
        assert_eq!(p.base_delay(1), Duration::from_millis(2000));
        assert_eq!(p.base_delay(2), Duration::from_millis(4000));
        assert_eq!(p.base_delay(3), Duration::from_millis(8000));
        assert_eq!(p.base_delay(4), Duration::from_millis(10_000));
        assert_eq!(p.base_delay(40), Duration::from_millis(10_000));
    }

    #[test]
    fn base_delay_is_monotonic() {
        let p = policy();
        let delays: Vec<Duration> = (0..20).map(|r| p.base_delay(r)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= p.max_delay));
    }

    #[test]
    fn jitter_is_symmetric_and_bounded() {
        let p = policy();
        let close = |d: Duration, ms: u64| d.abs_diff(Duration::from_millis(ms)) < Duration::from_millis(1);
        assert!(close(p.delay_with_sample(1, -1.0), 1600));
        assert!(close(p.delay_with_sample(1, 0.0), 2000));
        assert!(close(p.delay_with_sample(1, 1.0), 2400));
        for _ in 0..200 {
            let d = p.next_delay(2);
            assert!(d >= Duration::from_millis(3199) && d <= Duration::from_millis(4801));
        }
    }

    #[test]
    fn exhaustion_after_max_retries() {
        let p = policy();
        assert!(!p.exhausted(3));
        assert!(p.exhausted(4));
    }
}
