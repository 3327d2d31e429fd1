//! # Prometheus Job Scheduler
//!
//! A priority-aware async job scheduler for tokio applications.
//!
//! Jobs are admitted with an integer priority and run at most `concurrency`
//! at a time. The highest-priority pending job always starts next; equal
//! priorities start in submission order. On top of the concurrency gate the
//! scheduler offers:
//!
//! - **Cooperative cancellation**: every running job receives a
//!   [`CancelToken`](core::CancelToken) that is signaled on abort, timeout,
//!   destroy, or when the caller's own token fires
//! - **Per-job timeouts**: delivered as a cancellation signal, never a kill
//! - **Fixed rate windows**: at most `interval_cap` job starts per `interval`
//! - **Lifecycle events**: `Added`, `Next`, `Completed`, `Error`, `Empty`,
//!   `Idle`, `Paused`, `Resumed`
//! - **Pause / resume / clear / destroy** and re-prioritization of pending jobs
//!
//! ```rust,ignore
//! use prometheus_job_scheduler::config::SchedulerConfig;
//! use prometheus_job_scheduler::core::{CancelToken, EventKind, JobScheduler, SubmitOptions};
//! use std::time::Duration;
//!
//! let scheduler = JobScheduler::new(
//!     SchedulerConfig::new()
//!         .with_concurrency(4)
//!         .with_timeout(Duration::from_secs(30))
//!         .with_rate_window(10, Duration::from_secs(1)),
//! )?;
//!
//! scheduler.on(EventKind::Error, |event| eprintln!("{event:?}"));
//!
//! let id = scheduler.submit(
//!     |token: CancelToken| async move {
//!         token.run_until_cancelled(do_work()).await?;
//!         Ok(())
//!     },
//!     SubmitOptions::new().with_priority(5),
//! );
//!
//! scheduler.wait_idle().await;
//! ```
//!
//! The pending set is a [`PrioritySelector`](infra::queue::PrioritySelector):
//! a linear-scan selector over an insertion-ordered
//! [`Sequence`](infra::queue::Sequence), which keeps FIFO tie-breaking exact.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: jobs, cancellation, events and the scheduler.
pub mod core;
/// Configuration models for the scheduler.
pub mod config;
/// Containers backing the pending set.
pub mod infra;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;
