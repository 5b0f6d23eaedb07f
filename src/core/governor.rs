//! The governor: admission queue, dispatch loop and completion handling.
//!
//! All mutable state lives in one `parking_lot::Mutex` that is only ever held
//! for short, synchronous sections. The dispatch loop is a single spawned
//! task guarded by the `processing` flag; it sleeps on timers (quarantine,
//! pacing) or on a `Notify` (free slot, new work), never by polling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;

use crate::config::GovernorConfig;
use crate::core::dedup::DedupGuard;
use crate::core::gate::ConcurrencyGate;
use crate::core::observer::{LogEvent, LogLevel, LogSink};
use crate::core::pacing::{PacingController, Quarantine, RpmChange};
use crate::core::retry::RetryPolicy;
use crate::core::status::{GovernorCounters, GovernorStatus};
use crate::core::task::{BoundJob, GovernedTask, QueueItem, Spawn, TaskHandle, TaskOutcome, TaskQueue};
use crate::core::{GovernorError, TaskFailure};
use crate::runtime::TokioSpawner;
use crate::util::serde::{new_task_id, Priority, TaskId};

/// Mutable governor state; guarded by `Shared::state`.
struct GovernorState {
    queue: Box<dyn TaskQueue<QueueItem>>,
    pacing: PacingController,
    quarantine: Quarantine,
    gate: ConcurrencyGate,
    keys: DedupGuard,
    processing: bool,
    shutdown: bool,
    backing_off: usize,
    counters: GovernorCounters,
}

impl GovernorState {
    fn release_key(&mut self, item: &QueueItem) {
        if let Some(key) = item.key.as_deref() {
            self.keys.release(key);
        }
    }

    /// Mark the loop as running; returns `true` if the caller must start it.
    fn claim_loop(&mut self) -> bool {
        if self.processing {
            return false;
        }
        self.processing = true;
        true
    }
}

/// What the dispatch loop should do next.
enum Step {
    Stop,
    Wait {
        until: Option<Instant>,
        cooldown: Option<(Duration, u32)>,
    },
    Dispatch(QueueItem),
}

/// How a finished attempt is resolved once the state lock is released.
enum Resolution {
    Succeeded(RpmChange),
    Retry {
        delay: Duration,
        rpm: u32,
        cooldown: Duration,
        message: String,
    },
    Exhausted {
        rpm: u32,
        message: String,
    },
    Failed(anyhow::Error),
}

pub(crate) struct Shared<S> {
    config: GovernorConfig,
    retry: RetryPolicy,
    state: Mutex<GovernorState>,
    wake: Notify,
    sink: Arc<dyn LogSink>,
    spawner: S,
    seq: AtomicU64,
}

/// Admission control in front of a quota-limited remote service.
///
/// One governor per client session; clone the handle into every call site.
/// Tasks pass through the quarantine check, the concurrency gate and RPM
/// pacing before they run, and quota failures are retried with backoff.
///
/// ```rust,ignore
/// let governor = GovernorBuilder::new(GovernorConfig::default()).build()?;
/// let caption = governor
///     .enqueue(move || caption_asset(id), Priority::Low, Some(&id))
///     .await?;
/// ```
pub struct Governor<S = TokioSpawner> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for Governor<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> std::fmt::Debug for Governor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Governor")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl<S> Governor<S>
where
    S: Spawn + Send + Sync + 'static,
{
    /// Assemble a governor from validated parts.
    pub(crate) fn from_parts(
        config: GovernorConfig,
        spawner: S,
        sink: Arc<dyn LogSink>,
        queue: Box<dyn TaskQueue<QueueItem>>,
    ) -> Result<Self, GovernorError> {
        config.validate().map_err(GovernorError::InvalidConfig)?;
        let state = GovernorState {
            queue,
            pacing: PacingController::new(&config),
            quarantine: Quarantine::default(),
            gate: ConcurrencyGate::new(config.max_concurrent),
            keys: DedupGuard::default(),
            processing: false,
            shutdown: false,
            backing_off: 0,
            counters: GovernorCounters::default(),
        };
        Ok(Self {
            shared: Arc::new(Shared {
                retry: RetryPolicy::from(&config.retry),
                config,
                state: Mutex::new(state),
                wake: Notify::new(),
                sink,
                spawner,
                seq: AtomicU64::new(0),
            }),
        })
    }

    /// Configuration the governor was built with.
    pub fn config(&self) -> &GovernorConfig {
        &self.shared.config
    }

    /// Submit a task and wait for its outcome.
    ///
    /// Returns `Ok(None)` without running the task when `key` is already owned
    /// by a live task. Quota failures are retried internally; application
    /// failures are returned as [`GovernorError::Application`].
    pub async fn enqueue<T, G>(&self, task: G, priority: Priority, key: Option<&str>) -> TaskOutcome<T>
    where
        T: Send + 'static,
        G: GovernedTask<T>,
    {
        self.submit(task, priority, key).wait().await
    }

    /// Submit a task without waiting; the returned handle yields the outcome.
    ///
    /// Admission (duplicate check, queue depth, shutdown) is decided before
    /// this returns.
    pub fn submit<T, G>(&self, task: G, priority: Priority, key: Option<&str>) -> TaskHandle<T>
    where
        T: Send + 'static,
        G: GovernedTask<T>,
    {
        let id = new_task_id();
        let key = key.filter(|k| !k.is_empty()).map(str::to_owned);
        let (tx, rx) = oneshot::channel();
        let item = QueueItem {
            id,
            seq: self.shared.seq.fetch_add(1, Ordering::Relaxed),
            priority,
            key: key.clone(),
            retries: 0,
            job: Box::new(BoundJob::new(task, tx)),
        };

        let mut state = self.shared.state.lock();
        if state.shutdown {
            state.counters.rejected += 1;
            drop(state);
            return TaskHandle::failed(id, GovernorError::Shutdown);
        }
        if let Some(key) = key.as_deref() {
            if !state.keys.claim(key) {
                state.counters.skipped += 1;
                drop(state);
                self.shared.emit(
                    LogLevel::Warn,
                    format!("skipping duplicate request for `{key}`: already in progress"),
                    Some(id),
                );
                return TaskHandle::skipped(id);
            }
        }
        if let Err(err) = state.queue.push_back(item) {
            if let Some(key) = key.as_deref() {
                state.keys.release(key);
            }
            state.counters.rejected += 1;
            drop(state);
            self.shared.emit(LogLevel::Warn, format!("task rejected: {err}"), Some(id));
            return TaskHandle::failed(id, err);
        }
        state.counters.submitted += 1;
        let queued = state.queue.len();
        let start = state.claim_loop();
        drop(state);

        tracing::debug!(task = %id, %priority, queued, "task admitted");
        if start {
            Shared::start_loop(&self.shared);
        } else {
            self.shared.wake.notify_one();
        }
        TaskHandle::pending(id, rx)
    }

    /// Snapshot of the governor's state. Takes the state lock briefly and
    /// changes nothing.
    pub fn status(&self) -> GovernorStatus {
        let now = Instant::now();
        let state = self.shared.state.lock();
        let interval = state.pacing.interval();
        GovernorStatus {
            is_quarantined: state.quarantine.is_active(now),
            remaining_ms: u64::try_from(state.quarantine.remaining(now).as_millis()).unwrap_or(u64::MAX),
            current_rpm: state.pacing.current_rpm(),
            dispatch_interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            active_requests: state.gate.active(),
            max_concurrent: state.gate.max(),
            queued: state.queue.len(),
            backing_off: state.backing_off,
            success_streak: state.pacing.success_streak(),
            is_processing: state.processing,
            counters: state.counters.clone(),
        }
    }

    /// Highest number of tasks observed in flight together.
    pub fn peak_concurrency(&self) -> usize {
        self.shared.state.lock().gate.peak()
    }

    /// Stop dispatching and reject all queued work with [`GovernorError::Shutdown`].
    ///
    /// In-flight tasks run to completion. Tasks waiting out a retry backoff
    /// are rejected when their backoff ends. New submissions are refused.
    pub fn shutdown(&self) {
        let drained = {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            let drained = state.queue.drain();
            for item in &drained {
                state.release_key(item);
            }
            state.counters.failed += drained.len() as u64;
            drained
        };
        self.shared.wake.notify_one();
        self.shared.emit(
            LogLevel::Warn,
            format!("governor shut down, rejecting {} queued tasks", drained.len()),
            None,
        );
        for item in drained {
            item.reject(GovernorError::Shutdown);
        }
    }
}

impl<S> Shared<S> {
    fn emit(&self, level: LogLevel, message: impl Into<String>, task: Option<TaskId>) {
        self.sink.on_log(&LogEvent::new(level, message, task));
    }
}

impl<S> Shared<S>
where
    S: Spawn + Send + Sync + 'static,
{
    fn start_loop(this: &Arc<Self>) {
        let shared = Arc::clone(this);
        this.spawner.spawn(Self::run_loop(shared));
    }

    async fn run_loop(this: Arc<Self>) {
        tracing::debug!("dispatch loop started");
        let log_every = this.config.cooldown_log_interval();
        let mut last_cooldown_log: Option<Instant> = None;
        loop {
            match this.next_step() {
                Step::Stop => break,
                Step::Dispatch(item) => {
                    last_cooldown_log = None;
                    Self::launch(&this, item);
                }
                Step::Wait { until, cooldown } => {
                    if let Some((remaining, rpm)) = cooldown {
                        let now = Instant::now();
                        if last_cooldown_log.is_none_or(|at| now >= at + log_every) {
                            last_cooldown_log = Some(now);
                            this.emit(
                                LogLevel::Info,
                                format!(
                                    "cooling down: {}s remaining at {rpm} RPM",
                                    remaining.as_millis().div_ceil(1000)
                                ),
                                None,
                            );
                        }
                    }
                    match until {
                        Some(deadline) => {
                            tokio::select! {
                                () = this.wake.notified() => {}
                                () = tokio::time::sleep_until(deadline) => {}
                            }
                        }
                        None => this.wake.notified().await,
                    }
                }
            }
        }
        tracing::debug!("dispatch loop idle");
    }

    /// Decide the next loop action under the state lock.
    fn next_step(&self) -> Step {
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.shutdown || state.queue.is_empty() {
            state.processing = false;
            return Step::Stop;
        }
        if let Some(until) = state.quarantine.until().filter(|_| state.quarantine.is_active(now)) {
            let wake_at = until.min(now + self.config.cooldown_log_interval());
            return Step::Wait {
                until: Some(wake_at),
                cooldown: Some((until - now, state.pacing.current_rpm())),
            };
        }
        if !state.gate.has_slot() {
            return Step::Wait {
                until: None,
                cooldown: None,
            };
        }
        if !state.pacing.ready(now) {
            return Step::Wait {
                until: state.pacing.next_dispatch_at(),
                cooldown: None,
            };
        }
        let Some(item) = state.queue.pop() else {
            state.processing = false;
            return Step::Stop;
        };
        state.gate.try_acquire();
        state.pacing.record_dispatch(now);
        state.counters.dispatched += 1;
        Step::Dispatch(item)
    }

    /// Run one attempt in the background; the loop keeps pacing meanwhile.
    fn launch(this: &Arc<Self>, mut item: QueueItem) {
        tracing::debug!(
            task = %item.id,
            seq = item.seq,
            priority = %item.priority,
            retries = item.retries,
            "dispatching task"
        );
        let guard = InFlight {
            shared: Some(Arc::clone(this)),
            key: item.key.clone(),
            task: item.id,
        };
        let shared = Arc::clone(this);
        this.spawner.spawn(async move {
            let outcome = item.job.attempt().await;
            guard.disarm();
            Self::finish(&shared, item, outcome);
        });
    }

    /// Settle a finished attempt: free the slot, adjust pacing, then resolve
    /// or reschedule the item.
    fn finish(this: &Arc<Self>, mut item: QueueItem, outcome: Result<(), TaskFailure>) {
        let now = Instant::now();
        let resolution = {
            let mut state = this.state.lock();
            state.gate.release();
            match outcome {
                Ok(()) => {
                    state.release_key(&item);
                    state.counters.succeeded += 1;
                    Resolution::Succeeded(state.pacing.record_success())
                }
                Err(TaskFailure::QuotaExceeded {
                    message,
                    retry_after,
                }) => {
                    let rpm = state.pacing.record_quota_error();
                    let window = retry_after.map_or(this.config.cooldown(), |hint| {
                        hint.max(this.config.cooldown())
                    });
                    let until = state.quarantine.extend(now, window);
                    item.retries += 1;
                    if this.retry.exhausted(item.retries) {
                        state.release_key(&item);
                        state.counters.failed += 1;
                        Resolution::Exhausted { rpm, message }
                    } else {
                        state.counters.retried += 1;
                        state.backing_off += 1;
                        Resolution::Retry {
                            delay: this.retry.next_delay(item.retries),
                            rpm,
                            cooldown: until - now,
                            message,
                        }
                    }
                }
                Err(TaskFailure::Application(err)) => {
                    state.release_key(&item);
                    state.counters.failed += 1;
                    Resolution::Failed(err)
                }
            }
        };
        this.wake.notify_one();

        let id = Some(item.id);
        match resolution {
            Resolution::Succeeded(change) => {
                if let RpmChange::Raised(rpm) = change {
                    this.emit(LogLevel::Success, format!("rate ceiling raised to {rpm} RPM"), None);
                }
                this.emit(LogLevel::Success, "task completed", id);
                item.job.resolve();
            }
            Resolution::Retry {
                delay,
                rpm,
                cooldown,
                message,
            } => {
                this.emit(
                    LogLevel::Warn,
                    format!(
                        "quota exceeded ({message}); cut to {rpm} RPM, cooling down {}s, retry {}/{} in {}ms",
                        cooldown.as_millis().div_ceil(1000),
                        item.retries,
                        this.retry.max_retries,
                        delay.as_millis()
                    ),
                    id,
                );
                Self::schedule_retry(this, item, delay);
            }
            Resolution::Exhausted { rpm, message } => {
                let retries = item.retries - 1;
                this.emit(
                    LogLevel::Error,
                    format!("giving up after {retries} retries ({message}); now at {rpm} RPM"),
                    id,
                );
                item.reject(GovernorError::RetriesExhausted { retries });
            }
            Resolution::Failed(err) => {
                this.emit(LogLevel::Error, format!("task failed: {err:#}"), id);
                item.reject(GovernorError::Application(err));
            }
        }
    }

    fn schedule_retry(this: &Arc<Self>, item: QueueItem, delay: Duration) {
        let shared = Arc::clone(this);
        this.spawner.spawn(async move {
            tokio::time::sleep(delay).await;
            Self::readmit(&shared, item);
        });
    }

    /// Put a backed-off item back at the front of its band.
    fn readmit(this: &Arc<Self>, item: QueueItem) {
        let mut state = this.state.lock();
        state.backing_off = state.backing_off.saturating_sub(1);
        if state.shutdown {
            state.release_key(&item);
            drop(state);
            item.reject(GovernorError::Shutdown);
            return;
        }
        tracing::debug!(task = %item.id, retries = item.retries, "task re-admitted after backoff");
        state.queue.push_front(item);
        let start = state.claim_loop();
        drop(state);
        if start {
            Self::start_loop(this);
        } else {
            this.wake.notify_one();
        }
    }
}

/// Releases the slot and key of an attempt that never reported back
/// (its future was dropped or panicked).
struct InFlight<S> {
    shared: Option<Arc<Shared<S>>>,
    key: Option<String>,
    task: TaskId,
}

impl<S> InFlight<S> {
    fn disarm(mut self) {
        self.shared = None;
    }
}

impl<S> Drop for InFlight<S> {
    fn drop(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        {
            let mut state = shared.state.lock();
            state.gate.release();
            if let Some(key) = self.key.as_deref() {
                state.keys.release(key);
            }
            state.counters.failed += 1;
        }
        shared.wake.notify_one();
        shared.emit(
            LogLevel::Error,
            "task dropped before completion, slot released",
            Some(self.task),
        );
    }
}
