//! Job identifiers, submission options and registry state.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::core::cancel::CancelToken;
use crate::core::error::JobError;

/// Identifier of a submitted job. Unique while the job is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(crate::util::id::random_id())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The unit of work a job runs.
///
/// Implemented for any `FnOnce(CancelToken) -> impl Future<Output = Result<(), JobError>>`,
/// so closures and async blocks can be submitted directly. Implement it on
/// a struct when the work carries its own state.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_job_scheduler::core::{CancelToken, JobError, JobWork};
///
/// struct Reindex { shard: u32 }
///
/// #[async_trait]
/// impl JobWork for Reindex {
///     async fn run(self: Box<Self>, token: CancelToken) -> Result<(), JobError> {
///         for _batch in 0..100 {
///             token.check()?;
///             // ... index one batch of `self.shard` ...
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait JobWork: Send + 'static {
    /// Run the job. `token` is signaled on abort, timeout, destroy, or when
    /// the caller's own cancellation source fires.
    async fn run(self: Box<Self>, token: CancelToken) -> Result<(), JobError>;
}

#[async_trait]
impl<F, Fut> JobWork for F
where
    F: FnOnce(CancelToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    async fn run(self: Box<Self>, token: CancelToken) -> Result<(), JobError> {
        (*self)(token).await
    }
}

/// Per-submission options.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Priority; higher runs first. Defaults to 0.
    pub priority: i64,
    /// Caller-chosen id. A random id is generated when absent.
    pub id: Option<JobId>,
    /// Caller's cancellation source, linked into the job's token when it starts.
    pub cancellation: Option<CancelToken>,
    /// Per-job timeout, overriding the scheduler default.
    pub timeout: Option<Duration>,
}

impl SubmitOptions {
    /// Options with priority 0 and no id, cancellation or timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Set the job id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<JobId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Link a caller-owned cancellation source.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancelToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set a per-job timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An admitted job waiting in the selector.
pub(crate) struct JobRecord {
    pub id: JobId,
    pub work: Box<dyn JobWork>,
    pub cancellation: Option<CancelToken>,
    pub timeout: Option<Duration>,
}

impl JobRecord {
    /// Whether the caller's cancellation source already fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
    }
}

impl fmt::Debug for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRecord")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Registry entry for a tracked job.
#[derive(Debug)]
pub(crate) enum JobState {
    /// Waiting in the selector.
    Pending {
        priority: i64,
    },
    /// Started; owns the job's cancellation controller.
    Running {
        priority: i64,
        controller: CancelToken,
        timeout: Option<JoinHandle<()>>,
    },
}

impl JobState {
    pub const fn priority(&self) -> i64 {
        match self {
            Self::Pending { priority } | Self::Running { priority, .. } => *priority,
        }
    }

    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// Abort the armed timeout timer, if any.
    pub fn disarm_timeout(&mut self) {
        if let Self::Running { timeout, .. } = self {
            if let Some(handle) = timeout.take() {
                handle.abort();
            }
        }
    }
}
