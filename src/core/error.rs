//! Error types for governed tasks and governor operations.

use std::time::Duration;

use thiserror::Error;

/// Message fragments that transport layers use to signal a quota violation.
const QUOTA_MARKERS: [&str; 5] = [
    "429",
    "resource_exhausted",
    "resource exhausted",
    "quota",
    "rate limit",
];

/// Failure returned by a governed task body.
///
/// The variant decides how the governor reacts: quota failures are absorbed
/// by quarantine and retry, application failures go straight to the caller.
#[derive(Debug, Error)]
pub enum TaskFailure {
    /// The remote service rejected the call for exceeding its quota.
    #[error("quota exceeded: {message}")]
    QuotaExceeded {
        /// Provider message, kept for logs.
        message: String,
        /// Server-suggested wait before retrying, if the provider sent one.
        retry_after: Option<Duration>,
    },
    /// Any other failure raised by the task body.
    #[error(transparent)]
    Application(#[from] anyhow::Error),
}

impl TaskFailure {
    /// Quota failure without a retry hint.
    pub fn quota(message: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Quota failure carrying the provider's `Retry-After` hint.
    pub fn quota_with_retry_after(message: impl Into<String>, retry_after: Duration) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }

    /// Application failure from a plain message.
    pub fn application(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Application(anyhow::Error::msg(message))
    }

    /// Classify a transport error that is only available as text.
    ///
    /// Prefer constructing [`TaskFailure::QuotaExceeded`] directly where the
    /// status code is known.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_ascii_lowercase();
        if QUOTA_MARKERS.iter().any(|m| lowered.contains(m)) {
            Self::quota(message)
        } else {
            Self::Application(anyhow::Error::msg(message))
        }
    }

    /// Whether this failure should drive quarantine and retry.
    pub const fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Errors surfaced to callers of the governor.
#[derive(Debug, Error)]
pub enum GovernorError {
    /// The task kept hitting the quota and its retry budget ran out.
    #[error("rate limit exceeded after {retries} retries")]
    RetriesExhausted {
        /// Retries attempted before giving up.
        retries: u32,
    },
    /// The task body failed with a non-quota error.
    #[error("task failed: {0}")]
    Application(#[source] anyhow::Error),
    /// The admission queue is full.
    #[error("queue full: {depth} items waiting")]
    QueueFull {
        /// Queue depth at rejection time.
        depth: usize,
    },
    /// The governor was shut down before the task could run.
    #[error("governor shut down")]
    Shutdown,
    /// The task was dropped before it produced an outcome (e.g. it panicked).
    #[error("task abandoned before completion")]
    Abandoned,
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No async runtime was available to drive the governor.
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

impl GovernorError {
    /// Whether the caller gave up because of the quota rather than a task bug.
    pub const fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}
