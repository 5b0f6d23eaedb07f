//! Task abstractions: governed task bodies, queue items and caller handles.

use std::future::Future;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::core::{GovernorError, TaskFailure};
use crate::util::serde::{Priority, TaskId};

/// Outcome delivered to the caller: `Ok(None)` means the submission was
/// skipped as a duplicate of an in-flight key.
pub type TaskOutcome<T> = Result<Option<T>, GovernorError>;

/// A unit of remote work the governor may run more than once.
///
/// Quota failures cause the governor to call [`GovernedTask::run`] again
/// after backoff, so implementations must be re-runnable.
///
/// Any `FnMut() -> impl Future<Output = Result<T, TaskFailure>>` closure is a
/// governed task:
///
/// ```rust,ignore
/// governor
///     .enqueue(
///         move || {
///             let client = client.clone();
///             async move { client.caption(asset_id).await.map_err(TaskFailure::from_message) }
///         },
///         Priority::Low,
///         Some("asset-42"),
///     )
///     .await?;
/// ```
#[async_trait]
pub trait GovernedTask<T>: Send + 'static
where
    T: Send + 'static,
{
    /// Execute one attempt of the task.
    async fn run(&mut self) -> Result<T, TaskFailure>;
}

#[async_trait]
impl<T, F, Fut> GovernedTask<T> for F
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, TaskFailure>> + Send + 'static,
{
    async fn run(&mut self) -> Result<T, TaskFailure> {
        (self)().await
    }
}

/// Type-erased attempt/resolve surface the dispatch loop drives.
#[async_trait]
pub(crate) trait Job: Send {
    /// Run one attempt, holding any successful output until resolution.
    async fn attempt(&mut self) -> Result<(), TaskFailure>;
    /// Deliver the held output to the caller.
    fn resolve(self: Box<Self>);
    /// Deliver a terminal error to the caller.
    fn reject(self: Box<Self>, err: GovernorError);
}

/// Binds a governed task to the continuation of the caller awaiting it.
pub(crate) struct BoundJob<T, G> {
    task: G,
    output: Option<T>,
    reply: oneshot::Sender<TaskOutcome<T>>,
}

impl<T, G> BoundJob<T, G> {
    pub(crate) const fn new(task: G, reply: oneshot::Sender<TaskOutcome<T>>) -> Self {
        Self {
            task,
            output: None,
            reply,
        }
    }
}

#[async_trait]
impl<T, G> Job for BoundJob<T, G>
where
    T: Send + 'static,
    G: GovernedTask<T>,
{
    async fn attempt(&mut self) -> Result<(), TaskFailure> {
        let value = self.task.run().await?;
        self.output = Some(value);
        Ok(())
    }

    fn resolve(self: Box<Self>) {
        let Self { output, reply, .. } = *self;
        let outcome = output.map_or(Err(GovernorError::Abandoned), |v| Ok(Some(v)));
        // The caller may have stopped waiting; that is not an error here.
        let _ = reply.send(outcome);
    }

    fn reject(self: Box<Self>, err: GovernorError) {
        let _ = self.reply.send(Err(err));
    }
}

/// A pending task plus the bookkeeping the governor needs to schedule it.
pub struct QueueItem {
    /// Task identifier used in logs and handles.
    pub id: TaskId,
    /// Admission sequence number, used for FIFO tie-breaks.
    pub seq: u64,
    /// Priority band.
    pub priority: Priority,
    /// Optional deduplication key.
    pub key: Option<String>,
    /// Quota retries consumed so far.
    pub retries: u32,
    pub(crate) job: Box<dyn Job>,
}

impl std::fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueItem")
            .field("id", &self.id)
            .field("seq", &self.seq)
            .field("priority", &self.priority)
            .field("key", &self.key)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

impl QueueItem {
    /// Reject the item's continuation with a terminal error.
    pub(crate) fn reject(self, err: GovernorError) {
        self.job.reject(err);
    }
}

/// Priority accessor used by queue backends to pick a band.
pub trait Prioritized {
    /// Band the item belongs to.
    fn priority(&self) -> Priority;
}

impl Prioritized for QueueItem {
    fn priority(&self) -> Priority {
        self.priority
    }
}

/// Abstraction for admission queue backends.
pub trait TaskQueue<I>: Send {
    /// Admit a new item behind everything else in its band.
    fn push_back(&mut self, item: I) -> Result<(), GovernorError>;
    /// Re-admit a retried item ahead of everything else in its band.
    ///
    /// Never rejected: retried items already passed admission once.
    fn push_front(&mut self, item: I);
    /// Remove the next item to dispatch.
    fn pop(&mut self) -> Option<I>;
    /// Remove every queued item, highest band first.
    fn drain(&mut self) -> Vec<I>;
    /// Maximum depth allowed by `push_back`.
    fn max_depth(&self) -> usize;
    /// Current depth.
    fn len(&self) -> usize;
    /// Whether nothing is queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Abstraction for spawning detached futures on a runtime.
pub trait Spawn {
    /// Spawn a future that runs to completion independently of the caller.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

#[derive(Debug)]
enum HandleState<T> {
    Skipped,
    Failed(GovernorError),
    Pending(oneshot::Receiver<TaskOutcome<T>>),
}

/// Caller-side handle to a submitted task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    state: HandleState<T>,
}

impl<T> TaskHandle<T> {
    pub(crate) const fn pending(id: TaskId, rx: oneshot::Receiver<TaskOutcome<T>>) -> Self {
        Self {
            id,
            state: HandleState::Pending(rx),
        }
    }

    pub(crate) const fn skipped(id: TaskId) -> Self {
        Self {
            id,
            state: HandleState::Skipped,
        }
    }

    pub(crate) const fn failed(id: TaskId, err: GovernorError) -> Self {
        Self {
            id,
            state: HandleState::Failed(err),
        }
    }

    /// Identifier assigned at submission.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Whether the submission was short-circuited as a duplicate key.
    pub const fn is_skipped(&self) -> bool {
        matches!(self.state, HandleState::Skipped)
    }

    /// Wait for the task's outcome.
    pub async fn wait(self) -> TaskOutcome<T> {
        match self.state {
            HandleState::Skipped => Ok(None),
            HandleState::Failed(err) => Err(err),
            HandleState::Pending(rx) => rx.await.unwrap_or_else(|_| Err(GovernorError::Abandoned)),
        }
    }
}
