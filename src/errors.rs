// src/errors.rs

// error handling for the flux tempo types

// dependencies
use thiserror::Error;

use crate::clock::ClockError;

/// Error type for configuration, clock and timer issues.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TempoError {
    /// Concurrency limit must be at least one.
    #[error("Concurrency must be a positive number, got {0}")]
    InvalidConcurrency(usize),
    /// The clock could not produce a reading.
    #[error("Clock error occurred: {0}")]
    ClockError(#[from] ClockError),
    /// A timer had to be armed outside of a tokio runtime.
    #[error("No tokio runtime available to schedule a timer")]
    RuntimeUnavailable,
}

/// The retried operation failed on every attempt.
///
/// Only the error from the final attempt is kept; earlier ones are discarded.
#[derive(Debug, Error)]
#[error("Operation failed after {attempts} attempt(s)")]
pub struct RetryError<E> {
    /// Number of times the operation was invoked.
    pub attempts: u32,
    /// Error returned by the last attempt.
    #[source]
    pub source: E,
}

impl<E> RetryError<E> {
    /// Consume the error and return the last observed operation error.
    pub fn into_source(self) -> E {
        self.source
    }
}

/// Error returned by the bounded runner.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RunError<E> {
    /// The runner was misconfigured; no operation was started.
    #[error(transparent)]
    Config(#[from] TempoError),
    /// The operation for the item at `index` failed.
    #[error("Operation for item {index} failed")]
    Task {
        index: usize,
        #[source]
        source: E,
    },
}

impl<E> RunError<E> {
    /// The operation error, if this failure came from a task.
    pub fn into_task_error(self) -> Option<E> {
        match self {
            RunError::Task { source, .. } => Some(source),
            RunError::Config(_) => None,
        }
    }
}
