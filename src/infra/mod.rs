//! Infrastructure adapters for admission queue storage.

pub mod queue;
pub use queue::InMemoryQueue;
