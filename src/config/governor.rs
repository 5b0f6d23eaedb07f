//! Governor configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix shared by every environment variable read by [`GovernorConfig::from_env`].
pub const ENV_PREFIX: &str = "GOVERNOR_";

/// Retry/backoff settings applied to quota-exceeded failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Quota retries allowed before a task is rejected as exhausted.
    pub max_retries: u32,
    /// Base backoff before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on the jitter-free backoff, in milliseconds.
    pub max_delay_ms: u64,
    /// Symmetric jitter as a fraction of the computed delay (0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 2_000,
            max_delay_ms: 30_000,
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// Validate retry configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_delay_ms == 0 {
            return Err("initial_delay_ms must be greater than 0".into());
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err("max_delay_ms must be at least initial_delay_ms".into());
        }
        if !(0.0..1.0).contains(&self.jitter_factor) {
            return Err("jitter_factor must be in [0, 1)".into());
        }
        Ok(())
    }
}

/// Root governor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Requests-per-minute ceiling the governor starts with.
    pub initial_rpm: u32,
    /// Floor for the adaptive RPM ceiling.
    pub min_rpm: u32,
    /// Cap for the adaptive RPM ceiling.
    pub max_rpm: u32,
    /// RPM added after each full success streak.
    pub rpm_recovery_step: u32,
    /// Consecutive successes required before the RPM ceiling recovers.
    pub success_streak_threshold: u32,
    /// Maximum number of tasks in flight at once.
    pub max_concurrent: usize,
    /// Global cooldown applied after a quota error, in milliseconds.
    pub cooldown_ms: u64,
    /// How often a cooldown-remaining message is logged while quarantined.
    pub cooldown_log_interval_ms: u64,
    /// Maximum queued items before new submissions are rejected.
    pub max_queue_depth: usize,
    /// Retry/backoff settings.
    pub retry: RetryConfig,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            initial_rpm: 30,
            min_rpm: 2,
            max_rpm: 60,
            rpm_recovery_step: 2,
            success_streak_threshold: 10,
            max_concurrent: 3,
            cooldown_ms: 60_000,
            cooldown_log_interval_ms: 5_000,
            max_queue_depth: 10_000,
            retry: RetryConfig::default(),
        }
    }
}

impl GovernorConfig {
    /// Validate governor configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_rpm == 0 {
            return Err("min_rpm must be greater than 0".into());
        }
        if self.min_rpm > self.max_rpm {
            return Err("min_rpm must not exceed max_rpm".into());
        }
        if !(self.min_rpm..=self.max_rpm).contains(&self.initial_rpm) {
            return Err(format!(
                "initial_rpm {} outside [{}, {}]",
                self.initial_rpm, self.min_rpm, self.max_rpm
            ));
        }
        if self.success_streak_threshold == 0 {
            return Err("success_streak_threshold must be greater than 0".into());
        }
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.cooldown_log_interval_ms == 0 {
            return Err("cooldown_log_interval_ms must be greater than 0".into());
        }
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        self.retry
            .validate()
            .map_err(|e| format!("retry config invalid: {e}"))
    }

    /// Parse governor configuration from a JSON string and validate.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `GOVERNOR_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn read<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
            target: &mut T,
        ) -> Result<(), String> {
            let name = format!("{ENV_PREFIX}{key}");
            if let Some(raw) = lookup(&name) {
                *target = raw
                    .trim()
                    .parse()
                    .map_err(|_| format!("{name}: cannot parse `{raw}`"))?;
            }
            Ok(())
        }

        let mut cfg = Self::default();
        read(&lookup, "INITIAL_RPM", &mut cfg.initial_rpm)?;
        read(&lookup, "MIN_RPM", &mut cfg.min_rpm)?;
        read(&lookup, "MAX_RPM", &mut cfg.max_rpm)?;
        read(&lookup, "RPM_RECOVERY_STEP", &mut cfg.rpm_recovery_step)?;
        read(&lookup, "SUCCESS_STREAK", &mut cfg.success_streak_threshold)?;
        read(&lookup, "MAX_CONCURRENT", &mut cfg.max_concurrent)?;
        read(&lookup, "COOLDOWN_MS", &mut cfg.cooldown_ms)?;
        read(&lookup, "COOLDOWN_LOG_INTERVAL_MS", &mut cfg.cooldown_log_interval_ms)?;
        read(&lookup, "MAX_QUEUE_DEPTH", &mut cfg.max_queue_depth)?;
        read(&lookup, "MAX_RETRIES", &mut cfg.retry.max_retries)?;
        read(&lookup, "INITIAL_DELAY_MS", &mut cfg.retry.initial_delay_ms)?;
        read(&lookup, "MAX_DELAY_MS", &mut cfg.retry.max_delay_ms)?;
        read(&lookup, "JITTER_FACTOR", &mut cfg.retry.jitter_factor)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Cooldown window as a [`Duration`].
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Cooldown log interval as a [`Duration`].
    pub const fn cooldown_log_interval(&self) -> Duration {
        Duration::from_millis(self.cooldown_log_interval_ms)
    }
}
