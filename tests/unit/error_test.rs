//! Tests for error types

use std::time::Duration;

use quota_governor::core::{GovernorError, TaskFailure};

#[test]
fn test_retries_exhausted_error() {
    let err = GovernorError::RetriesExhausted { retries: 2 };
    assert_eq!(format!("{}", err), "rate limit exceeded after 2 retries");
}

#[test]
fn test_queue_full_error() {
    let err = GovernorError::QueueFull { depth: 5 };
    assert_eq!(format!("{}", err), "queue full: 5 items waiting");
}

#[test]
fn test_shutdown_error() {
    assert_eq!(format!("{}", GovernorError::Shutdown), "governor shut down");
}

#[test]
fn test_application_error_keeps_source() {
    let err = GovernorError::Application(anyhow::anyhow!("bad prompt"));
    assert_eq!(format!("{}", err), "task failed: bad prompt");
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_quota_failure_with_hint() {
    let failure = TaskFailure::quota_with_retry_after("429", Duration::from_secs(30));
    assert!(failure.is_quota());
    assert_eq!(format!("{}", failure), "quota exceeded: 429");
    match failure {
        TaskFailure::QuotaExceeded { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(30)));
        }
        TaskFailure::Application(_) => panic!("expected quota failure"),
    }
}

#[test]
fn test_application_failure_display_is_transparent() {
    let failure = TaskFailure::application("model not found");
    assert!(!failure.is_quota());
    assert_eq!(format!("{}", failure), "model not found");
}
