// src/config.rs

//! Configuration types for the retrier and the bounded runner

// dependencies
use crate::errors::TempoError;
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub(crate) retries: u32,
    pub(crate) base_delay: Duration,
    pub(crate) exponential: bool,
}

impl RetryConfig {
    /// Create a new configuration with a retry budget and base delay.
    /// Exponential backoff is enabled by default.
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
            exponential: true,
        }
    }

    /// Builder-style: set the number of retries after the first attempt
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Builder-style: set the base delay between attempts
    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Builder-style: double the delay after every failed attempt
    pub fn exponential(mut self, exponential: bool) -> Self {
        self.exponential = exponential;
        self
    }

    /// Total number of attempts this configuration allows.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(300))
    }
}

/// Configuration for bounded parallel execution
#[derive(Debug, Clone, Default)]
pub struct BoundedConfig {
    pub(crate) concurrency: Option<usize>,
    pub(crate) launch_delay: Duration,
}

impl BoundedConfig {
    /// Create a configuration allowing at most `concurrency` operations in flight
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: Some(concurrency),
            launch_delay: Duration::ZERO,
        }
    }

    /// Create a configuration with no concurrency limit
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Builder-style: set the concurrency limit
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Builder-style: wait this long between successive launches
    pub fn launch_delay(mut self, launch_delay: Duration) -> Self {
        self.launch_delay = launch_delay;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TempoError> {
        match self.concurrency {
            Some(0) => Err(TempoError::InvalidConcurrency(0)),
            _ => Ok(()),
        }
    }
}
