// src/retry.rs

// retry-with-backoff for fallible async operations

// dependencies
use crate::config::RetryConfig;
use crate::delay::delay;
use crate::errors::RetryError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Repeatedly invokes an async operation until it succeeds or the retry
/// budget is spent. Attempts never overlap.
#[derive(Debug, Clone, Default)]
pub struct Retrier {
    config: RetryConfig,
}

impl Retrier {
    // method to create a retrier from a config object
    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    // accessor for the configured retry budget
    pub fn retries(&self) -> u32 {
        self.config.retries
    }

    /// Wait before the attempt following `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        backoff_delay(&self.config, attempt)
    }

    /// Run `operation`, passing it the zero-based attempt number.
    ///
    /// Returns the first success. If attempt `retries` also fails, the error
    /// from that final attempt is returned; earlier errors are dropped.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(source) if attempt >= self.config.retries => {
                    let attempts = attempts_made(attempt);
                    warn!(attempts, "retries exhausted");
                    return Err(RetryError { attempts, source });
                }
                Err(_) => {
                    let wait = self.delay_after(attempt);
                    debug!(attempt, wait_ms = wait.as_millis() as u64, "attempt failed, backing off");
                    delay(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Run `operation` with the given retry policy.
///
/// ```rust
/// use flux_tempo::{retry, RetryConfig};
/// use std::time::Duration;
///
/// # tokio_test_block_on(async {
/// let config = RetryConfig::new(2, Duration::from_millis(1));
/// let value = retry(|attempt| async move {
///     if attempt < 2 { Err("not yet") } else { Ok(attempt) }
/// }, &config).await.unwrap();
/// assert_eq!(value, 2);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(f)
/// # }
/// ```
pub async fn retry<T, E, F, Fut>(operation: F, config: &RetryConfig) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    Retrier::with_config(config.clone()).run(operation).await
}

// number of attempts made once zero-based `attempt` has run
fn attempts_made(attempt: u32) -> u32 {
    attempt.saturating_add(1)
}

/// Delay between attempt `attempt` and the next one.
///
/// `base_delay * 2^attempt` when exponential, otherwise `base_delay`.
/// A zero base always waits zero. Saturates at `Duration::MAX` only when the
/// product does not fit in a `Duration`. No jitter.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    if !config.exponential || config.base_delay.is_zero() {
        return config.base_delay;
    }
    1u128
        .checked_shl(attempt)
        .and_then(|factor| config.base_delay.as_nanos().checked_mul(factor))
        .and_then(duration_from_nanos)
        .unwrap_or(Duration::MAX)
}

// None when the seconds part exceeds u64
fn duration_from_nanos(nanos: u128) -> Option<Duration> {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
    let subsec = (nanos % NANOS_PER_SEC) as u32;
    Some(Duration::new(secs, subsec))
}
