//! Tokio runtime spawner used for jobs and scheduler timers.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

use crate::core::SchedulerError;

/// Spawns job tasks, timeout timers and the rate-window ticker onto a
/// tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NoRuntime`] outside a tokio runtime.
    pub fn current() -> Result<Self, SchedulerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| SchedulerError::NoRuntime)
    }

    /// Spawner for a runtime the caller owns.
    ///
    /// The runtime must outlive the scheduler; tasks spawned after it shuts
    /// down never run.
    #[must_use]
    pub fn from_runtime(runtime: &Runtime) -> Self {
        Self::new(runtime.handle().clone())
    }

    /// The underlying runtime handle.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawn a future on the runtime.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(fut)
    }

    /// Run `on_fire` once after `delay`. Aborting the returned handle
    /// disarms the timer.
    pub fn spawn_timer<F>(&self, delay: Duration, on_fire: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        })
    }
}
