// src/clock.rs

// clock module definition and implementations

// dependencies
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::time::Instant;

/// Clock trait to abstract time retrieval.
/// Implementors must be thread-safe (Send + Sync).
/// The `now` method returns the current time in nanoseconds as a u64.
/// Throttles read it to decide whether a call falls inside the current window.
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<u64, ClockError>;
}

/// Clock error type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("system time is before the unix epoch")]
    SystemTimeError,
}

/// SystemClock implementation using the wall clock.
/// Returns the current time in nanoseconds since the Unix epoch.
/// Fails with `ClockError::SystemTimeError` if the system clock is before the epoch.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<u64, ClockError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .map_err(|_| ClockError::SystemTimeError)
    }
}

/// Monotonic clock measuring nanoseconds since its own creation.
///
/// Backed by `tokio::time::Instant`, so it follows the runtime's notion of
/// time: when the runtime clock is paused in tests, this clock only moves
/// when the test advances it. This is the default clock for throttles.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Result<u64, ClockError> {
        Ok(self.origin.elapsed().as_nanos() as u64)
    }
}
