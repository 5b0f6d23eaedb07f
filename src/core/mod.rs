//! Core admission control: queueing, pacing, quarantine, retry and dedup.

pub mod dedup;
pub mod error;
pub mod gate;
pub mod governor;
pub mod observer;
pub mod pacing;
pub mod retry;
pub mod status;
pub mod task;

pub use dedup::DedupGuard;
pub use error::{GovernorError, TaskFailure};
pub use gate::ConcurrencyGate;
pub use governor::Governor;
pub use observer::{InMemoryLogSink, LogEvent, LogLevel, LogSink, TracingLogSink};
pub use pacing::{PacingController, Quarantine, RpmChange};
pub use retry::RetryPolicy;
pub use status::{GovernorCounters, GovernorStatus};
pub use task::{GovernedTask, Prioritized, QueueItem, Spawn, TaskHandle, TaskOutcome, TaskQueue};
