// src/bounded.rs

// bounded parallel runner: apply an async operation to every item with at
// most N operations in flight, returning results in input order

// dependencies
use crate::config::BoundedConfig;
use crate::errors::{RunError, TempoError};
use futures::future::{self, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::Sleep;
use tracing::{debug, trace};

/// Runs an operation over a sequence of items under a concurrency limit.
#[derive(Debug, Clone)]
pub struct BoundedRunner {
    concurrency: Option<usize>,
    launch_delay: Duration,
}

impl BoundedRunner {
    // method to create a runner from a config object
    pub fn with_config(config: BoundedConfig) -> Result<Self, TempoError> {
        config.validate()?;
        Ok(Self {
            concurrency: config.concurrency,
            launch_delay: config.launch_delay,
        })
    }

    // accessor for the concurrency limit; None means unbounded
    pub fn concurrency(&self) -> Option<usize> {
        self.concurrency
    }

    /// Apply `operation` to every item.
    ///
    /// The result at index `i` always belongs to `items[i]`, whatever order
    /// the operations complete in. With a limit, once an operation fails no
    /// further items are started; operations already in flight run to
    /// completion and their results are discarded, then the first failure is
    /// returned. Without a limit (and without a launch delay) every operation
    /// starts at once and the first failure returns immediately, dropping the
    /// rest.
    pub async fn run<I, O, E, F, Fut>(&self, items: I, operation: F) -> Result<Vec<O>, RunError<E>>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = Result<O, E>>,
    {
        match self.concurrency {
            None if self.launch_delay.is_zero() => run_all(items, operation).await,
            limit => {
                run_limited(
                    items,
                    operation,
                    limit.unwrap_or(usize::MAX),
                    self.launch_delay,
                )
                .await
            }
        }
    }
}

/// Apply `operation` to every item with the given configuration.
///
/// Fails with [`TempoError::InvalidConcurrency`] before starting anything if
/// the concurrency limit is zero.
pub async fn run_bounded<I, O, E, F, Fut>(
    items: I,
    operation: F,
    config: &BoundedConfig,
) -> Result<Vec<O>, RunError<E>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    BoundedRunner::with_config(config.clone())?
        .run(items, operation)
        .await
}

// launch everything, fail on the first error
async fn run_all<I, O, E, F, Fut>(items: I, mut operation: F) -> Result<Vec<O>, RunError<E>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    let tasks: Vec<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            operation(item).map(move |outcome| outcome.map_err(|source| RunError::Task { index, source }))
        })
        .collect();
    debug!(tasks = tasks.len(), "running unbounded");
    future::try_join_all(tasks).await
}

async fn run_limited<I, O, E, F, Fut>(
    items: I,
    mut operation: F,
    limit: usize,
    launch_delay: Duration,
) -> Result<Vec<O>, RunError<E>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    let mut pending = items.into_iter().enumerate().peekable();
    let mut results: Vec<Option<O>> = Vec::with_capacity(pending.size_hint().0);
    let mut in_flight = FuturesUnordered::new();
    let mut launch_gate: Option<Pin<Box<Sleep>>> = None;
    let mut failure: Option<(usize, E)> = None;
    let mut total = 0usize;

    debug!(limit, launch_delay_ms = launch_delay.as_millis() as u64, "running bounded");

    loop {
        // admit work while there is a free slot and no failure has been seen
        while failure.is_none() && launch_gate.is_none() && in_flight.len() < limit {
            let Some((index, item)) = pending.next() else {
                break;
            };
            results.push(None);
            total += 1;
            let task = operation(item);
            in_flight.push(async move { (index, task.await) });
            trace!(index, in_flight = in_flight.len(), "launched");

            if !launch_delay.is_zero() && pending.peek().is_some() {
                launch_gate = Some(Box::pin(tokio::time::sleep(launch_delay)));
            }
        }

        let more_to_launch = failure.is_none() && pending.peek().is_some();
        if in_flight.is_empty() && !more_to_launch {
            break;
        }

        tokio::select! {
            Some((index, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
                match outcome {
                    Ok(value) => {
                        if failure.is_none() {
                            results[index] = Some(value);
                        }
                    }
                    Err(source) => {
                        if failure.is_none() {
                            debug!(index, in_flight = in_flight.len(), "operation failed, draining in-flight work");
                            failure = Some((index, source));
                        }
                    }
                }
            }
            () = wait_for_gate(&mut launch_gate), if launch_gate.is_some() => {
                launch_gate = None;
            }
        }
    }

    if let Some((index, source)) = failure {
        return Err(RunError::Task { index, source });
    }

    let output: Vec<O> = results.into_iter().flatten().collect();
    debug_assert_eq!(output.len(), total);
    Ok(output)
}

async fn wait_for_gate(gate: &mut Option<Pin<Box<Sleep>>>) {
    match gate {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}
