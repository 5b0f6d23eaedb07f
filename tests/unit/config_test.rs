//! Tests for configuration validation

use quota_governor::config::{GovernorConfig, RetryConfig};

#[test]
fn test_default_config_validation() {
    assert!(GovernorConfig::default().validate().is_ok());
}

#[test]
fn test_config_invalid_min_rpm() {
    let invalid = GovernorConfig {
        min_rpm: 0,
        ..GovernorConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_initial_rpm_out_of_range() {
    let invalid = GovernorConfig {
        initial_rpm: 120,
        max_rpm: 60,
        ..GovernorConfig::default()
    };
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("initial_rpm"));
}

#[test]
fn test_config_invalid_concurrency() {
    let invalid = GovernorConfig {
        max_concurrent: 0,
        ..GovernorConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_retry_config_invalid_jitter() {
    let invalid = GovernorConfig {
        retry: RetryConfig {
            jitter_factor: 1.5,
            ..RetryConfig::default()
        },
        ..GovernorConfig::default()
    };
    let err = invalid.validate().unwrap_err();
    assert!(err.starts_with("retry config invalid"));
}

#[test]
fn test_retry_config_max_below_initial() {
    let invalid = RetryConfig {
        initial_delay_ms: 5_000,
        max_delay_ms: 1_000,
        ..RetryConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_from_json_partial() {
    let json = r#"{
        "initial_rpm": 10,
        "max_concurrent": 2,
        "retry": { "max_retries": 5 }
    }"#;

    let config = GovernorConfig::from_json_str(json).unwrap();
    assert_eq!(config.initial_rpm, 10);
    assert_eq!(config.max_concurrent, 2);
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.initial_delay_ms, RetryConfig::default().initial_delay_ms);
    assert_eq!(config.cooldown_ms, 60_000);
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(GovernorConfig::from_json_str(r#"{ "max_concurrent": 0 }"#).is_err());
    assert!(GovernorConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_json_roundtrip_shape() {
    let value = serde_json::to_value(GovernorConfig::default()).unwrap();
    assert_eq!(value["retry"]["jitter_factor"], serde_json::json!(0.2));
    assert_eq!(value["success_streak_threshold"], serde_json::json!(10));
}
