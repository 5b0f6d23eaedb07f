//! Tests for builder modules

use std::sync::Arc;

use quota_governor::builders::GovernorBuilder;
use quota_governor::config::GovernorConfig;
use quota_governor::core::{GovernorError, InMemoryLogSink, LogSink};
use quota_governor::infra::InMemoryQueue;

#[test]
fn test_builder_keeps_config() {
    let config = GovernorConfig {
        max_concurrent: 7,
        ..GovernorConfig::default()
    };
    let builder = GovernorBuilder::new(config);
    assert_eq!(builder.config().max_concurrent, 7);
}

#[test]
fn test_build_requires_runtime() {
    let result = GovernorBuilder::new(GovernorConfig::default()).build();
    assert!(matches!(result, Err(GovernorError::Runtime(_))));
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let config = GovernorConfig {
        min_rpm: 10,
        max_rpm: 5,
        ..GovernorConfig::default()
    };
    let result = GovernorBuilder::new(config).build();
    assert!(matches!(result, Err(GovernorError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_build_with_custom_parts() {
    let sink = Arc::new(InMemoryLogSink::new(16));
    let shared: Arc<dyn LogSink> = sink.clone();
    let governor = GovernorBuilder::new(GovernorConfig::default())
        .with_shared_sink(shared)
        .with_queue(Box::new(InMemoryQueue::new(4)))
        .build()
        .unwrap();

    let status = governor.status();
    assert_eq!(status.current_rpm, 30);
    assert_eq!(status.queued, 0);
    assert!(!status.is_quarantined);
    assert!(sink.events().is_empty());
}
