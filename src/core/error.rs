//! Error types for scheduler operations and job outcomes.

use std::time::Duration;

use thiserror::Error;

use crate::core::job::JobId;

/// Errors produced by the scheduler itself.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler was destroyed and accepts no more work.
    #[error("scheduler destroyed")]
    Destroyed,
    /// A job with this id is already pending or running.
    #[error("duplicate job id: {0}")]
    DuplicateId(JobId),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No tokio runtime is available to drive jobs and timers.
    #[error("no tokio runtime available")]
    NoRuntime,
}

/// Reasons a job can fail. Delivered through the `Error` event.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job was aborted through the scheduler.
    #[error("job aborted{}", reason_suffix(.0.as_deref()))]
    Aborted(Option<String>),
    /// The job exceeded its timeout.
    #[error("job timed out after {0:?}")]
    TimedOut(Duration),
    /// The scheduler was destroyed while the job was running.
    #[error("scheduler destroyed")]
    Destroyed,
    /// The caller-supplied cancellation source fired.
    #[error("job cancelled: {0}")]
    Cancelled(String),
    /// The job body panicked.
    #[error("job panicked: {0}")]
    Panicked(String),
    /// The job returned an error of its own.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl JobError {
    /// Whether this error came from a cancellation signal rather than the job itself.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Aborted(_) | Self::TimedOut(_) | Self::Destroyed | Self::Cancelled(_)
        )
    }
}

fn reason_suffix(reason: Option<&str>) -> String {
    reason.map(|r| format!(": {r}")).unwrap_or_default()
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
