//! Core scheduling abstractions: jobs, cancellation, events and the scheduler.

pub mod cancel;
pub mod error;
pub mod events;
pub mod job;
pub mod scheduler;
pub mod stats;

pub use cancel::{CancelReason, CancelToken};
pub use error::{AppResult, JobError, SchedulerError};
pub use events::{EventBus, EventKind, ListenerFn, ListenerId, SchedulerEvent};
pub use job::{JobId, JobWork, SubmitOptions};
pub use scheduler::JobScheduler;
pub use stats::SchedulerStats;
