// src/pool.rs

// keyed throttles: one independent throttle per key, created on first use

// dependencies
use crate::clock::{Clock, MonotonicClock};
use crate::errors::TempoError;
use crate::throttle::{Throttle, ThrottleDecision};
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type KeyedFn<K, A> = Arc<dyn Fn(&K, A) + Send + Sync>;

/// A pool of throttles keyed by `K` (e.g. a hostname or user id).
///
/// Every key gets its own window state, so a burst on one key never delays
/// another. The wrapped function receives the key along with the arguments.
/// We use a `DashMap` for concurrent access to per-key throttles.
pub struct ThrottlePool<K, A, C = MonotonicClock>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    func: KeyedFn<K, A>,
    window: Duration,
    clock: C,
    throttles: DashMap<K, Arc<Throttle<A, C>>>,
}

impl<K, A> ThrottlePool<K, A, MonotonicClock>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    /// Create a pool throttling each key to one invocation per `window`.
    pub fn new<F>(func: F, window: Duration) -> Self
    where
        F: Fn(&K, A) + Send + Sync + 'static,
    {
        Self::with_clock(func, window, MonotonicClock::new())
    }
}

impl<K, A, C> ThrottlePool<K, A, C>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    A: Send + 'static,
    C: Clock + Clone + 'static,
{
    /// Create a pool whose throttles all read time from `clock`.
    pub fn with_clock<F>(func: F, window: Duration, clock: C) -> Self
    where
        F: Fn(&K, A) + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            window,
            clock,
            throttles: DashMap::new(),
        }
    }

    // accessor method to return the window shared by every key
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.throttles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.throttles.is_empty()
    }

    /// Call the function for `key`, throttled independently of other keys.
    pub fn call(&self, key: K, args: A) -> Result<ThrottleDecision, TempoError> {
        // the map guard must not be held while the function runs
        let throttle = self
            .throttles
            .entry(key.clone())
            .or_insert_with(|| Arc::new(self.throttle_for(key)))
            .value()
            .clone();
        throttle.call(args)
    }

    /// Cancel the pending trailing invocation for `key`, if any.
    pub fn cancel(&self, key: &K) {
        if let Some(throttle) = self.throttles.get(key) {
            throttle.cancel();
        }
    }

    /// Remove keys idle for longer than `max_idle_nanos`.
    ///
    /// A key is idle when it has no trailing invocation pending and its last
    /// invocation is older than the threshold.
    pub fn cleanup_idle(&self, max_idle_nanos: u64) -> Result<(), TempoError> {
        let current_time_nanos = self.clock.now()?;
        let cutoff = current_time_nanos.saturating_sub(max_idle_nanos);
        let before = self.throttles.len();
        self.throttles.retain(|_, throttle| {
            throttle.is_pending()
                || throttle
                    .last_invocation_nanos()
                    .is_some_and(|last| last > cutoff)
        });
        debug!(
            removed = before.saturating_sub(self.throttles.len()),
            "cleaned up idle throttle keys"
        );
        Ok(())
    }

    fn throttle_for(&self, key: K) -> Throttle<A, C> {
        let func = Arc::clone(&self.func);
        Throttle::with_clock(move |args| func(&key, args), self.window, self.clock.clone())
    }
}
