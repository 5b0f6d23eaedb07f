//! Tokio runtime spawner implementation.

use std::future::Future;

use crate::core::{GovernorError, Spawn};

/// Tokio-based spawner that runs the dispatch loop and task attempts on a
/// tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Create a `TokioSpawner` from a tokio runtime handle.
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Spawner bound to the runtime the caller is running on.
    pub fn try_current() -> Result<Self, GovernorError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| GovernorError::Runtime(e.to_string()))
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
