//! # Quota Governor
//!
//! Client-side admission control for a remote, quota-limited AI service.
//!
//! Many independent callers (image analysis, edits, theme generation,
//! captioning, reel curation) share one external API whose rate limit is
//! unknown, can change at runtime, and answers violations with hard failures
//! (HTTP 429). The governor sits between those callers and the API and decides
//! when each call may go out.
//!
//! ## Layers
//!
//! - **Admission queue**: two priority bands, FIFO within a band; retried
//!   tasks re-enter at the front of their band
//! - **Pacing**: an adaptive requests-per-minute ceiling turned into a minimum
//!   spacing between dispatches; slow additive recovery, halving on quota errors
//! - **Concurrency gate**: caps tasks in flight, independent of pacing
//! - **Quarantine**: a global cooldown after a quota error during which
//!   nothing is dispatched
//! - **Retry/backoff**: exponential backoff with jitter and a bounded budget
//! - **Deduplication**: at most one live task per caller-supplied key
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quota_governor::builders::GovernorBuilder;
//! use quota_governor::config::GovernorConfig;
//! use quota_governor::core::{InMemoryLogSink, TaskFailure};
//! use quota_governor::util::Priority;
//!
//! let governor = GovernorBuilder::new(GovernorConfig::default())
//!     .with_sink(|msg: &str, level| println!("[{level}] {msg}"))
//!     .build()?;
//!
//! let tags = governor
//!     .enqueue(
//!         move || async move {
//!             analyze(asset_id).await.map_err(|e| match e.status() {
//!                 Some(429) => TaskFailure::quota(e.to_string()),
//!                 _ => TaskFailure::Application(e.into()),
//!             })
//!         },
//!         Priority::High,
//!         Some("asset-42"),
//!     )
//!     .await?;
//!
//! // `None` means another analysis of asset-42 was already running.
//! println!("{tags:?} / {}", governor.status().banner());
//! ```
//!
//! For complete examples, see `tests/governor_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission control: queueing, pacing, quarantine, retry and dedup.
pub mod core;
/// Configuration models for the governor and its retry policy.
pub mod config;
/// Builders to construct governors from configuration.
pub mod builders;
/// Infrastructure adapters for queue storage.
pub mod infra;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::GovernorBuilder;
pub use crate::config::GovernorConfig;
pub use crate::core::{Governor, GovernorError, GovernorStatus, LogLevel, TaskFailure};
pub use crate::util::serde::Priority;
