//! Builders to construct governors from configuration.

pub mod governor_builder;

pub use governor_builder::GovernorBuilder;
