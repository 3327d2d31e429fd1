//! Typed lifecycle events and the listener registry.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::error::JobError;
use crate::core::job::JobId;

/// Event discriminant used to register listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A job was admitted.
    Added,
    /// The dispatcher picked the next job (or skipped a cancelled one).
    Next,
    /// A job finished successfully.
    Completed,
    /// A job failed.
    Error,
    /// No jobs are pending.
    Empty,
    /// No jobs are pending or running.
    Idle,
    /// The scheduler was paused.
    Paused,
    /// The scheduler was resumed.
    Resumed,
}

/// A lifecycle event delivered to listeners.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A job was admitted into the pending set.
    Added {
        /// Admitted job.
        id: JobId,
    },
    /// A job was started. `id` is `None` when a pending job was skipped
    /// because its cancellation source had already fired.
    Next {
        /// Started job, if any.
        id: Option<JobId>,
    },
    /// A job completed without error.
    Completed {
        /// Finished job.
        id: JobId,
    },
    /// A job returned or propagated an error.
    Error {
        /// Failed job.
        id: JobId,
        /// Failure cause.
        error: Arc<JobError>,
    },
    /// The pending set drained.
    Empty,
    /// Nothing is pending and nothing is running.
    Idle,
    /// Dispatch was paused.
    Paused,
    /// Dispatch was resumed.
    Resumed,
}

impl SchedulerEvent {
    /// The discriminant of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Added { .. } => EventKind::Added,
            Self::Next { .. } => EventKind::Next,
            Self::Completed { .. } => EventKind::Completed,
            Self::Error { .. } => EventKind::Error,
            Self::Empty => EventKind::Empty,
            Self::Idle => EventKind::Idle,
            Self::Paused => EventKind::Paused,
            Self::Resumed => EventKind::Resumed,
        }
    }

    /// The job this event refers to, if any.
    #[must_use]
    pub const fn job_id(&self) -> Option<&JobId> {
        match self {
            Self::Added { id } | Self::Completed { id } | Self::Error { id, .. } => Some(id),
            Self::Next { id } => id.as_ref(),
            Self::Empty | Self::Idle | Self::Paused | Self::Resumed => None,
        }
    }
}

/// Listener callback.
pub type ListenerFn = Arc<dyn Fn(&SchedulerEvent) + Send + Sync>;

/// Handle returned on registration, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    once: bool,
    callback: ListenerFn,
}

/// Registry mapping each [`EventKind`] to its listeners.
///
/// Emission snapshots the listener list under the lock and invokes the
/// callbacks after releasing it, so listeners may register or remove
/// listeners (or call back into the scheduler) freely. Listeners added
/// during an emission do not receive that event.
pub struct EventBus {
    listeners: Mutex<HashMap<EventKind, Vec<Listener>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn register(&self, kind: EventKind, once: bool, callback: ListenerFn) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .entry(kind)
            .or_default()
            .push(Listener { id, once, callback });
        id
    }

    /// Register a listener for every future `kind` event.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&SchedulerEvent) + Send + Sync + 'static,
    {
        self.register(kind, false, Arc::new(callback))
    }

    /// Register a listener for the next `kind` event only.
    pub fn once<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&SchedulerEvent) + Send + Sync + 'static,
    {
        self.register(kind, true, Arc::new(callback))
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(list) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l.id != id);
        before != list.len()
    }

    /// Remove every listener for `kind`, or for all kinds when `None`.
    pub fn remove_all_listeners(&self, kind: Option<EventKind>) {
        let mut listeners = self.listeners.lock();
        match kind {
            Some(kind) => {
                listeners.remove(&kind);
            }
            None => listeners.clear(),
        }
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to its listeners in registration order.
    pub fn emit(&self, event: &SchedulerEvent) {
        let snapshot: Vec<ListenerFn> = {
            let mut listeners = self.listeners.lock();
            let Some(list) = listeners.get_mut(&event.kind()) else {
                return;
            };
            let callbacks = list.iter().map(|l| Arc::clone(&l.callback)).collect();
            list.retain(|l| !l.once);
            callbacks
        };

        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                tracing::error!(event = ?event.kind(), "event listener panicked");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.lock();
        let counts: HashMap<_, _> = listeners.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}
