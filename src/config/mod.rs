//! Configuration models for the governor, its pacing and its retry policy.

pub mod governor;

pub use governor::{GovernorConfig, RetryConfig};
