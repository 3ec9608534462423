// src/delay.rs

//! Suspension and timer primitives shared by every other module.

// dependencies
use crate::errors::TempoError;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Suspend the current task for at least `duration`.
///
/// Consumes no CPU while suspended. Dropping the returned future before it
/// completes releases the underlying timer.
pub async fn delay(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    tokio::time::sleep(duration).await;
}

/// A callback scheduled to run once after a delay.
///
/// The callback runs on a spawned tokio task. Dropping the handle detaches
/// the timer; call [`ScheduledCall::cancel`] to stop it from firing.
#[derive(Debug)]
pub struct ScheduledCall {
    handle: JoinHandle<()>,
}

impl ScheduledCall {
    /// Run `callback` once `after` has elapsed on the current tokio runtime.
    ///
    /// The deadline is fixed when this is called, not when the task first runs.
    pub fn schedule<F>(after: Duration, callback: F) -> Result<Self, TempoError>
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + after;
        Self::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            callback();
        })
    }

    fn spawn<Fut>(task: Fut) -> Result<Self, TempoError>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| TempoError::RuntimeUnavailable)?;
        Ok(Self {
            handle: runtime.spawn(task),
        })
    }

    /// Stop the callback from firing if it has not started yet.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the callback has run or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
