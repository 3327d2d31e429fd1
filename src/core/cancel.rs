//! Cooperative cancellation tokens.
//!
//! A [`CancelToken`] can be signaled once, carries the reason it was
//! signaled with, and can spawn child tokens that are signaled whenever
//! their parent is. The scheduler hands every running job a child of the
//! caller's token (if any) and signals that child on abort, timeout or
//! destroy; whichever source fires first decides the reason.
//!
//! Cancellation never interrupts a job. Jobs observe the token through
//! [`CancelToken::is_cancelled`], [`CancelToken::check`],
//! [`CancelToken::cancelled`] or [`CancelToken::run_until_cancelled`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::core::error::JobError;

/// Why a token was signaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// Aborted through the scheduler, with an optional caller message.
    Aborted(Option<String>),
    /// The per-job timeout elapsed.
    TimedOut(Duration),
    /// The scheduler was destroyed.
    Destroyed,
    /// Signaled by the caller's own cancellation source.
    External(String),
}

impl From<CancelReason> for JobError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Aborted(msg) => Self::Aborted(msg),
            CancelReason::TimedOut(after) => Self::TimedOut(after),
            CancelReason::Destroyed => Self::Destroyed,
            CancelReason::External(msg) => Self::Cancelled(msg),
        }
    }
}

/// Cloneable cancellation handle. All clones share one signal.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    token: CancellationToken,
    reason: Arc<Mutex<Option<CancelReason>>>,
    parent: Option<Box<CancelToken>>,
}

impl CancelToken {
    /// Create an unsignaled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that is signaled whenever `self` is.
    ///
    /// If `self` is already signaled the child starts out signaled.
    /// Signaling the child does not affect the parent.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            reason: Arc::new(Mutex::new(None)),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// Signal the token. Returns `false` if it was already signaled, in
    /// which case the original reason is kept.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        {
            let mut slot = self.reason.lock();
            if slot.is_some() || self.token.is_cancelled() {
                return false;
            }
            *slot = Some(reason);
        }
        self.token.cancel();
        true
    }

    /// Signal the token as an external cancellation with a message.
    pub fn cancel_external(&self, message: impl Into<String>) -> bool {
        self.cancel(CancelReason::External(message.into()))
    }

    /// Whether this token (or any ancestor) has been signaled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The reason the token was signaled, if it has been.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        if let Some(reason) = self.reason.lock().clone() {
            return Some(reason);
        }
        if !self.token.is_cancelled() {
            return None;
        }
        self.parent.as_ref().and_then(|parent| parent.reason())
    }

    /// The error a job should report when it stops because of this token.
    #[must_use]
    pub fn error(&self) -> JobError {
        self.reason().map_or_else(
            || JobError::Cancelled("cancelled".into()),
            JobError::from,
        )
    }

    /// `Err` with the cancellation error once signaled, `Ok(())` before.
    ///
    /// # Errors
    ///
    /// Returns the [`JobError`] matching the cancellation reason.
    pub fn check(&self) -> Result<(), JobError> {
        if self.is_cancelled() {
            Err(self.error())
        } else {
            Ok(())
        }
    }

    /// Resolves once the token is signaled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Drive `fut` to completion unless the token fires first.
    ///
    /// # Errors
    ///
    /// Returns the cancellation error if the token is signaled before `fut`
    /// completes. `fut` is dropped in that case.
    pub async fn run_until_cancelled<F>(&self, fut: F) -> Result<F::Output, JobError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(self.error()),
            out = fut => Ok(out),
        }
    }
}
