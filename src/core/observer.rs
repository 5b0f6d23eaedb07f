//! Log sinks: the push hook through which the governor reports what it does.
//!
//! The surrounding application wires a sink to its own telemetry or UI. The
//! default sink forwards everything to `tracing`.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::TaskId;

/// Severity of a governor log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Routine progress.
    Info,
    /// Degraded but recoverable (quota hit, duplicate skipped).
    Warn,
    /// A task was rejected.
    Error,
    /// A task completed or the rate ceiling recovered.
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Success => "success",
        })
    }
}

/// One event pushed to a [`LogSink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Task the event concerns, if any.
    pub task_id: Option<TaskId>,
    /// Wall-clock timestamp in milliseconds.
    pub created_at_ms: u128,
}

impl LogEvent {
    /// Build an event stamped with the current time.
    pub fn new(level: LogLevel, message: impl Into<String>, task_id: Option<TaskId>) -> Self {
        Self {
            level,
            message: message.into(),
            task_id,
            created_at_ms: now_ms(),
        }
    }
}

/// Log sink abstraction.
///
/// Called synchronously from the governor, so implementations must be quick
/// and must not call back into the governor.
pub trait LogSink: Send + Sync {
    /// Receive one event.
    fn on_log(&self, event: &LogEvent);
}

impl<F> LogSink for F
where
    F: Fn(&str, LogLevel) + Send + Sync,
{
    fn on_log(&self, event: &LogEvent) {
        self(&event.message, event.level);
    }
}

/// Sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn on_log(&self, event: &LogEvent) {
        let task = event.task_id.map(|id| id.to_string()).unwrap_or_default();
        match event.level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(kind = %event.level, task = %task, "{}", event.message);
            }
            LogLevel::Warn => tracing::warn!(task = %task, "{}", event.message),
            LogLevel::Error => tracing::error!(task = %task, "{}", event.message),
        }
    }
}

/// In-memory sink for testing and status panels, keeping the newest events.
pub struct InMemoryLogSink {
    events: Mutex<VecDeque<LogEvent>>,
    max_events: usize,
}

impl InMemoryLogSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Count stored events at `level` whose message contains `needle`.
    pub fn count(&self, level: LogLevel, needle: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == level && e.message.contains(needle))
            .count()
    }
}

impl LogSink for InMemoryLogSink {
    fn on_log(&self, event: &LogEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn in_memory_sink_is_bounded() {
        let sink = InMemoryLogSink::new(2);
        for i in 0..3 {
            sink.on_log(&LogEvent::new(LogLevel::Info, format!("event {i}"), None));
        }
        let messages: Vec<String> = sink.events().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["event 1", "event 2"]);
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = move |msg: &str, level: LogLevel| captured.lock().push((msg.to_owned(), level));
        sink.on_log(&LogEvent::new(LogLevel::Warn, "cooling down", None));
        assert_eq!(seen.lock()[0], ("cooling down".to_owned(), LogLevel::Warn));
    }
}
