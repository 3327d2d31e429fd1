//! Configuration models for the scheduler.

pub mod scheduler;

pub use scheduler::{RateWindow, SchedulerConfig, ENV_PREFIX};
