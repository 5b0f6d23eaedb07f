//! Builder to construct a governor from configuration.

use std::sync::Arc;

use crate::config::GovernorConfig;
use crate::core::{Governor, GovernorError, LogSink, QueueItem, Spawn, TaskQueue, TracingLogSink};
use crate::infra::queue::InMemoryQueue;
use crate::runtime::TokioSpawner;

/// Builder for a [`Governor`].
///
/// Defaults: `tracing` log sink, in-memory queue sized by
/// `max_queue_depth`, and the current tokio runtime.
pub struct GovernorBuilder {
    config: GovernorConfig,
    sink: Arc<dyn LogSink>,
    queue: Option<Box<dyn TaskQueue<QueueItem>>>,
}

impl GovernorBuilder {
    /// Create a builder from a configuration.
    pub fn new(config: GovernorConfig) -> Self {
        Self {
            config,
            sink: Arc::new(TracingLogSink),
            queue: None,
        }
    }

    /// Create a builder from `GOVERNOR_*` environment variables.
    pub fn from_env() -> Result<Self, GovernorError> {
        GovernorConfig::from_env()
            .map(Self::new)
            .map_err(GovernorError::InvalidConfig)
    }

    /// Configuration to build with.
    pub const fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Route log events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Route log events to a sink the caller keeps a handle to.
    #[must_use]
    pub fn with_shared_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use a custom admission queue backend.
    #[must_use]
    pub fn with_queue(mut self, queue: Box<dyn TaskQueue<QueueItem>>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Build on the current tokio runtime.
    pub fn build(self) -> Result<Governor<TokioSpawner>, GovernorError> {
        let spawner = TokioSpawner::try_current()?;
        self.build_with_spawner(spawner)
    }

    /// Build with an explicit spawner.
    pub fn build_with_spawner<S>(self, spawner: S) -> Result<Governor<S>, GovernorError>
    where
        S: Spawn + Send + Sync + 'static,
    {
        let queue: Box<dyn TaskQueue<QueueItem>> = match self.queue {
            Some(queue) => queue,
            None => Box::new(InMemoryQueue::new(self.config.max_queue_depth)),
        };
        Governor::from_parts(self.config, spawner, self.sink, queue)
    }
}
