//! Tests for utility functions

use quota_governor::util::{init_tracing, new_task_id, now_ms, Priority};

#[test]
fn test_priority_ordering() {
    assert!(Priority::High > Priority::Low);
    assert_eq!(Priority::default(), Priority::Low);
}

#[test]
fn test_priority_serde() {
    assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
    let p: Priority = serde_json::from_str("\"low\"").unwrap();
    assert_eq!(p, Priority::Low);
    assert_eq!(Priority::High.to_string(), "high");
}

#[test]
fn test_task_ids_unique() {
    assert_ne!(new_task_id(), new_task_id());
}

#[test]
fn test_now_ms_advances() {
    let a = now_ms();
    let b = now_ms();
    assert!(b >= a);
    assert!(a > 1_600_000_000_000);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("telemetry initialised");
}
