//! Priority-aware job scheduler.
//!
//! [`JobScheduler`] admits jobs into a [`PrioritySelector`], starts up to
//! `concurrency` of them at a time (highest priority first, FIFO among
//! equals), optionally caps how many may start per fixed rate window, and
//! reports every transition through the [`EventBus`].
//!
//! All bookkeeping lives behind one mutex that is held only for state
//! transitions. A transition collects the events and job launches it
//! produces; they are emitted and spawned after the lock is released, in
//! order, so listeners may call back into the scheduler and a job's `Next`
//! event always precedes its `Completed`/`Error`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{RateWindow, SchedulerConfig};
use crate::core::cancel::{CancelReason, CancelToken};
use crate::core::error::{JobError, SchedulerError};
use crate::core::events::{EventBus, EventKind, ListenerId, SchedulerEvent};
use crate::core::job::{JobId, JobRecord, JobState, JobWork, SubmitOptions};
use crate::core::stats::{Counters, SchedulerStats};
use crate::infra::queue::PrioritySelector;
use crate::runtime::TokioSpawner;

/// Mutable scheduler state. Guarded by `Inner::state`.
struct State {
    pending: PrioritySelector<JobRecord>,
    registry: HashMap<JobId, JobState>,
    running: usize,
    paused: bool,
    destroyed: bool,
    interval_count: usize,
    ticker: Option<JoinHandle<()>>,
}

/// A job picked by a dispatch pass, spawned once the lock is released.
struct Launch {
    id: JobId,
    work: Box<dyn JobWork>,
    controller: CancelToken,
}

/// Side effects of one state transition.
#[derive(Default)]
struct Pass {
    events: Vec<SchedulerEvent>,
    launches: Vec<Launch>,
}

struct Inner {
    concurrency: usize,
    default_timeout: Option<Duration>,
    rate_window: Option<RateWindow>,
    spawner: TokioSpawner,
    state: Mutex<State>,
    events: EventBus,
    counters: Counters,
}

/// Priority job scheduler with bounded concurrency, cooperative
/// cancellation, per-job timeouts and an optional fixed rate window.
///
/// Cloning is cheap; clones share the same scheduler.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_job_scheduler::config::SchedulerConfig;
/// use prometheus_job_scheduler::core::{CancelToken, JobScheduler, SubmitOptions};
///
/// let scheduler = JobScheduler::new(SchedulerConfig::new().with_concurrency(2))?;
/// let id = scheduler.submit(
///     |token: CancelToken| async move {
///         token.check()?;
///         Ok(())
///     },
///     SubmitOptions::new().with_priority(10),
/// );
/// scheduler.wait_idle().await;
/// ```
#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<Inner>,
}

impl JobScheduler {
    /// Create a scheduler on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::InvalidConfig`] if `config` fails validation
    /// - [`SchedulerError::NoRuntime`] outside a tokio runtime
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::with_spawner(config, TokioSpawner::current()?)
    }

    /// Create a scheduler that spawns onto `spawner`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if `config` fails validation.
    pub fn with_spawner(
        config: SchedulerConfig,
        spawner: TokioSpawner,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let inner = Arc::new(Inner {
            concurrency: config.concurrency,
            default_timeout: config.timeout(),
            rate_window: config.rate_window(),
            spawner,
            state: Mutex::new(State {
                pending: PrioritySelector::new(),
                registry: HashMap::new(),
                running: 0,
                paused: !config.auto_start,
                destroyed: false,
                interval_count: 0,
                ticker: None,
            }),
            events: EventBus::new(),
            counters: Counters::default(),
        });

        if let Some(window) = inner.rate_window {
            let ticker = spawn_ticker(&inner.spawner, Arc::downgrade(&inner), window);
            inner.state.lock().ticker = Some(ticker);
        }

        info!(
            concurrency = config.concurrency,
            auto_start = config.auto_start,
            timeout_ms = ?config.timeout_ms,
            rate_window = ?inner.rate_window,
            "job scheduler created"
        );

        Ok(Self { inner })
    }

    /// Submit a job. Returns its id, or `None` if the scheduler was
    /// destroyed or the requested id is already tracked.
    ///
    /// Use [`try_submit`](Self::try_submit) to learn why a submission was refused.
    pub fn submit<W>(&self, work: W, options: SubmitOptions) -> Option<JobId>
    where
        W: JobWork,
    {
        self.try_submit(work, options).ok()
    }

    /// Submit a job, reporting why it was refused.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Destroyed`] after [`destroy`](Self::destroy)
    /// - [`SchedulerError::DuplicateId`] if `options.id` is pending or running
    pub fn try_submit<W>(&self, work: W, options: SubmitOptions) -> Result<JobId, SchedulerError>
    where
        W: JobWork,
    {
        let inner = &self.inner;
        let mut pass = Pass::default();
        let id = {
            let mut state = inner.state.lock();
            if state.destroyed {
                warn!("submission rejected: scheduler destroyed");
                return Err(SchedulerError::Destroyed);
            }

            let id = options.id.unwrap_or_else(JobId::random);
            if state.registry.contains_key(&id) {
                warn!(job_id = %id, "submission rejected: duplicate id");
                return Err(SchedulerError::DuplicateId(id));
            }

            let record = JobRecord {
                id: id.clone(),
                work: Box::new(work),
                cancellation: options.cancellation,
                timeout: options.timeout.or(inner.default_timeout),
            };
            state.registry.insert(
                id.clone(),
                JobState::Pending {
                    priority: options.priority,
                },
            );
            state.pending.insert(record, options.priority);
            debug!(job_id = %id, priority = options.priority, "job admitted");

            pass.events.push(SchedulerEvent::Added { id: id.clone() });
            inner.dispatch_locked(&mut state, &mut pass);
            id
        };

        Counters::bump(&inner.counters.submitted);
        inner.flush(pass);
        Ok(id)
    }

    /// Start dispatching. Needed once for schedulers created with
    /// `auto_start = false`; otherwise the same as [`resume`](Self::resume).
    pub fn start(&self) -> &Self {
        self.resume();
        self
    }

    /// Stop starting new jobs. Running jobs are unaffected.
    pub fn pause(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.destroyed || state.paused {
                return;
            }
            state.paused = true;
        }
        info!("job scheduler paused");
        self.inner.emit_live(&SchedulerEvent::Paused);
    }

    /// Resume dispatching after [`pause`](Self::pause).
    pub fn resume(&self) {
        let mut pass = Pass::default();
        {
            let mut state = self.inner.state.lock();
            if state.destroyed || !state.paused {
                return;
            }
            state.paused = false;
            pass.events.push(SchedulerEvent::Resumed);
            self.inner.dispatch_locked(&mut state, &mut pass);
        }
        info!("job scheduler resumed");
        self.inner.flush(pass);
    }

    /// Drop every pending job. Running jobs are unaffected.
    ///
    /// Returns the number of jobs removed.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut state = self.inner.state.lock();
            if state.destroyed {
                return 0;
            }
            state.registry.retain(|_, job| job.is_running());
            std::mem::take(&mut state.pending)
        };
        // job closures are dropped outside the lock
        let removed = dropped.len();
        drop(dropped);
        debug!(removed, "pending jobs cleared");
        removed
    }

    /// Change a job's priority.
    ///
    /// For a pending job this changes when it will be selected; for a
    /// running job only the recorded value changes. Returns `false` if the
    /// id is not tracked.
    pub fn set_priority(&self, id: &JobId, priority: i64) -> bool {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.destroyed {
            return false;
        }

        match state.registry.get_mut(id) {
            None => false,
            Some(JobState::Running { priority: current, .. }) => {
                *current = priority;
                true
            }
            Some(JobState::Pending { priority: current }) => {
                *current = priority;
                let mut found = false;
                let rebuilt = state.pending.drain_all().into_iter().map(|(record, old)| {
                    if record.id == *id {
                        found = true;
                        (record, priority)
                    } else {
                        (record, old)
                    }
                });
                state.pending.import_all(rebuilt.collect::<Vec<_>>());
                debug!(job_id = %id, priority, "pending job re-prioritized");
                found
            }
        }
    }

    /// Abort a job.
    ///
    /// A pending job is removed and never starts. A running job has its
    /// token signaled with [`CancelReason::Aborted`]; it stops only if it
    /// observes the token. Returns `false` if the id is not tracked.
    pub fn abort(&self, id: &JobId, reason: Option<String>) -> bool {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.destroyed {
            return false;
        }

        let was_running = match state.registry.get(id) {
            None => return false,
            Some(JobState::Running { controller, .. }) => {
                controller.cancel(CancelReason::Aborted(reason));
                true
            }
            Some(JobState::Pending { .. }) => false,
        };

        if was_running {
            debug!(job_id = %id, "running job signaled to abort");
        } else {
            state.registry.remove(id);
            state.pending.retain(|record, _| record.id != *id);
            debug!(job_id = %id, "pending job aborted");
        }
        true
    }

    /// Shut the scheduler down for good.
    ///
    /// Pending jobs are dropped, running jobs are signaled with
    /// [`CancelReason::Destroyed`], the rate-window ticker stops and all
    /// listeners are removed. Every later call is a no-op.
    pub fn destroy(&self) {
        let (signaled, dropped) = {
            let mut state = self.inner.state.lock();
            if state.destroyed {
                return;
            }
            // listeners go first so no emission that observes `destroyed` finds any
            self.inner.events.remove_all_listeners(None);
            state.destroyed = true;
            if let Some(ticker) = state.ticker.take() {
                ticker.abort();
            }

            let mut signaled = 0usize;
            for (_, mut job) in state.registry.drain() {
                job.disarm_timeout();
                if let JobState::Running { controller, .. } = &job {
                    controller.cancel(CancelReason::Destroyed);
                    signaled += 1;
                }
            }
            state.running = 0;
            state.interval_count = 0;
            (signaled, std::mem::take(&mut state.pending))
        };
        drop(dropped);
        info!(signaled, "job scheduler destroyed");
    }

    /// Register a listener for `kind` events.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&SchedulerEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, callback)
    }

    /// Register a listener for the next `kind` event only.
    pub fn once<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&SchedulerEvent) + Send + Sync + 'static,
    {
        self.inner.events.once(kind, callback)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.events.off(kind, id)
    }

    /// Remove all listeners for `kind`, or every listener when `None`.
    pub fn remove_all_listeners(&self, kind: Option<EventKind>) {
        self.inner.events.remove_all_listeners(kind);
    }

    /// Listen for `Empty`, invoking `callback` right away if nothing is
    /// pending now.
    pub fn on_empty<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&SchedulerEvent) + Send + Sync + 'static,
    {
        self.on_condition(EventKind::Empty, SchedulerEvent::Empty, Self::is_empty, callback)
    }

    /// Listen for `Idle`, invoking `callback` right away if nothing is
    /// pending or running now.
    pub fn on_idle<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&SchedulerEvent) + Send + Sync + 'static,
    {
        self.on_condition(EventKind::Idle, SchedulerEvent::Idle, Self::is_idle, callback)
    }

    fn on_condition<F>(
        &self,
        kind: EventKind,
        event: SchedulerEvent,
        holds: fn(&Self) -> bool,
        callback: F,
    ) -> ListenerId
    where
        F: Fn(&SchedulerEvent) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let listener = Arc::clone(&callback);
        let id = self.inner.events.on(kind, move |e| listener(e));
        if !self.is_destroyed() && holds(self) {
            callback(&event);
        }
        id
    }

    /// Resolves once nothing is pending. Returns immediately if that
    /// already holds or the scheduler is destroyed.
    pub async fn wait_empty(&self) {
        self.wait_for(EventKind::Empty, Self::is_empty).await;
    }

    /// Resolves once nothing is pending or running. Returns immediately if
    /// that already holds or the scheduler is destroyed.
    pub async fn wait_idle(&self) {
        self.wait_for(EventKind::Idle, Self::is_idle).await;
    }

    async fn wait_for(&self, kind: EventKind, holds: fn(&Self) -> bool) {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));
        let id = self.inner.events.once(kind, move |_| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
        });
        if self.is_destroyed() || holds(self) {
            self.inner.events.off(kind, id);
            return;
        }
        // destroy drops the listener and with it the sender
        let _ = rx.await;
    }

    /// Queue size: jobs waiting to start. Running jobs are reported by
    /// [`active_count`](Self::active_count).
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Jobs waiting to start.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Jobs currently running.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().running
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().pending.is_empty()
    }

    /// Whether nothing is pending or running.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.pending.is_empty() && state.running == 0
    }

    /// Whether dispatch is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    /// Whether [`destroy`](Self::destroy) was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.state.lock().destroyed
    }

    /// Configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// Recorded priority of a tracked job.
    #[must_use]
    pub fn priority_of(&self, id: &JobId) -> Option<i64> {
        self.inner.state.lock().registry.get(id).map(JobState::priority)
    }

    /// Whether the job is currently running.
    #[must_use]
    pub fn is_running(&self, id: &JobId) -> bool {
        self.inner
            .state
            .lock()
            .registry
            .get(id)
            .is_some_and(JobState::is_running)
    }

    /// Snapshot of scheduler activity.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let mut stats = {
            let state = self.inner.state.lock();
            SchedulerStats {
                concurrency: self.inner.concurrency,
                running: state.running,
                pending: state.pending.len(),
                paused: state.paused,
                destroyed: state.destroyed,
                ..SchedulerStats::default()
            }
        };
        self.inner.counters.fill(&mut stats);
        stats
    }
}

impl fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("JobScheduler")
            .field("concurrency", &self.inner.concurrency)
            .field("running", &state.running)
            .field("pending", &state.pending.len())
            .field("paused", &state.paused)
            .field("destroyed", &state.destroyed)
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// Move jobs from pending to running while every gate allows it.
    fn dispatch_locked(&self, state: &mut State, pass: &mut Pass) {
        loop {
            if state.destroyed
                || state.paused
                || state.running >= self.concurrency
                || state.pending.is_empty()
            {
                break;
            }
            if let Some(window) = self.rate_window {
                if state.interval_count >= window.cap {
                    break;
                }
            }

            let Some(entry) = state.pending.extract_highest_entry() else {
                break;
            };
            let record = entry.value;

            if record.is_cancelled() {
                state.registry.remove(&record.id);
                Counters::bump(&self.counters.skipped);
                debug!(job_id = %record.id, "skipping job cancelled before start");
                pass.events.push(SchedulerEvent::Next { id: None });
                continue;
            }

            self.start_locked(state, record, entry.priority, pass);

            if let Some(window) = self.rate_window {
                state.interval_count += 1;
                if state.interval_count >= window.cap {
                    break;
                }
            }
        }

        if state.pending.is_empty() && !state.destroyed {
            pass.events.push(SchedulerEvent::Empty);
            if state.running == 0 {
                pass.events.push(SchedulerEvent::Idle);
            }
        }
    }

    fn start_locked(&self, state: &mut State, record: JobRecord, priority: i64, pass: &mut Pass) {
        let JobRecord {
            id,
            work,
            cancellation,
            timeout,
        } = record;

        let controller = cancellation
            .as_ref()
            .map_or_else(CancelToken::new, CancelToken::child);

        let timer = timeout.map(|after| {
            let token = controller.clone();
            let job_id = id.clone();
            self.spawner.spawn_timer(after, move || {
                if token.cancel(CancelReason::TimedOut(after)) {
                    debug!(job_id = %job_id, ?after, "job timed out");
                }
            })
        });

        state.registry.insert(
            id.clone(),
            JobState::Running {
                priority,
                controller: controller.clone(),
                timeout: timer,
            },
        );
        state.running += 1;
        debug!(job_id = %id, priority, running = state.running, "job started");

        pass.events.push(SchedulerEvent::Next {
            id: Some(id.clone()),
        });
        pass.launches.push(Launch {
            id,
            work,
            controller,
        });
    }

    /// Emit the events of a pass, then spawn the jobs it started.
    fn flush(self: &Arc<Self>, pass: Pass) {
        for event in &pass.events {
            if !self.emit_live(event) {
                return;
            }
        }
        if pass.launches.is_empty() || self.state.lock().destroyed {
            return;
        }
        for launch in pass.launches {
            self.launch(launch);
        }
    }

    /// Emit `event` unless the scheduler was destroyed. Returns `false` once
    /// destroyed.
    fn emit_live(&self, event: &SchedulerEvent) -> bool {
        if self.state.lock().destroyed {
            return false;
        }
        self.events.emit(event);
        true
    }

    fn launch(self: &Arc<Self>, launch: Launch) {
        let inner = Arc::clone(self);
        let Launch {
            id,
            work,
            controller,
        } = launch;

        self.spawner.spawn(async move {
            // run the body in its own task so a panic is caught at the join
            let outcome = match inner.spawner.spawn(work.run(controller)).await {
                Ok(result) => result,
                Err(err) => Err(join_error(err)),
            };
            inner.finish(&id, outcome);
        });
    }

    /// Report a job's outcome and release its slot.
    fn finish(self: &Arc<Self>, id: &JobId, outcome: Result<(), JobError>) {
        if self.state.lock().destroyed {
            return;
        }

        match outcome {
            Ok(()) => {
                Counters::bump(&self.counters.completed);
                debug!(job_id = %id, "job completed");
                self.emit_live(&SchedulerEvent::Completed { id: id.clone() });
            }
            Err(error) => {
                Counters::bump(&self.counters.failed);
                warn!(job_id = %id, error = %error, "job failed");
                self.emit_live(&SchedulerEvent::Error {
                    id: id.clone(),
                    error: Arc::new(error),
                });
            }
        }

        let mut pass = Pass::default();
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            if state.registry.get(id).is_some_and(JobState::is_running) {
                if let Some(mut job) = state.registry.remove(id) {
                    job.disarm_timeout();
                }
                state.running = state.running.saturating_sub(1);
            }
            if !state.paused {
                self.dispatch_locked(&mut state, &mut pass);
            }
        }
        self.flush(pass);
    }

    /// Rate-window tick: open a new window and dispatch. Returns `false`
    /// once the scheduler is destroyed.
    fn on_tick(self: &Arc<Self>) -> bool {
        let mut pass = Pass::default();
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return false;
            }
            state.interval_count = 0;
            self.dispatch_locked(&mut state, &mut pass);
        }
        self.flush(pass);
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(ticker) = self.state.get_mut().ticker.take() {
            ticker.abort();
        }
    }
}

/// Reset the window count every period. Holds only a weak reference so
/// dropping the last scheduler handle ends the loop.
fn spawn_ticker(spawner: &TokioSpawner, inner: Weak<Inner>, window: RateWindow) -> JoinHandle<()> {
    spawner.spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + window.period, window.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            if !inner.on_tick() {
                break;
            }
        }
    })
}

fn join_error(err: JoinError) -> JobError {
    if !err.is_panic() {
        return JobError::Cancelled("job task cancelled by runtime".into());
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    JobError::Panicked(message)
}
