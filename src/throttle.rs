// src/throttle.rs

// throttle: invoke a callable at most once per window, with a trailing call
// carrying the latest arguments

// dependencies
use crate::clock::{Clock, MonotonicClock};
use crate::delay::ScheduledCall;
use crate::errors::TempoError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// What a call to a throttled function did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// The function ran immediately with this call's arguments.
    Invoked,
    /// A trailing invocation was armed to carry this call's arguments.
    Scheduled {
        /// Time until the trailing invocation fires.
        after: Duration,
    },
    /// A trailing invocation was already armed; its arguments were replaced.
    Coalesced,
}

/// Wraps a function so it runs at most once per `window`.
///
/// The first call in a fresh window runs the function immediately on the
/// caller's task. Calls that arrive before the window has elapsed update the
/// pending arguments and arm a single trailing invocation, which fires when
/// the window allows it with the arguments of the most recent call.
///
/// Each `Throttle` owns its own state; wrapping the same function twice gives
/// two independent throttles. The trailing invocation runs on a spawned tokio
/// task: a panic there unwinds that task only and is not reported to callers.
pub struct Throttle<A, C = MonotonicClock>
where
    C: Clock,
{
    inner: Arc<Inner<A, C>>,
}

struct Inner<A, C> {
    func: Box<dyn Fn(A) + Send + Sync>,
    window_nanos: u64,
    clock: C,
    state: Mutex<ThrottleState<A>>,
}

struct ThrottleState<A> {
    last_invocation: Option<u64>,
    pending_args: Option<A>,
    timer: Option<ScheduledCall>,
    // bumped whenever the armed timer is replaced or cancelled
    epoch: u64,
}

impl<A> ThrottleState<A> {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.pending_args = None;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

impl<A> Throttle<A, MonotonicClock>
where
    A: Send + 'static,
{
    /// Throttle `func` to one invocation per `window` using the monotonic clock.
    pub fn new<F>(func: F, window: Duration) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_clock(func, window, MonotonicClock::new())
    }
}

impl<A, C> Throttle<A, C>
where
    A: Send + 'static,
    C: Clock + 'static,
{
    /// Throttle `func` to one invocation per `window`, reading time from `clock`.
    pub fn with_clock<F>(func: F, window: Duration, clock: C) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                func: Box::new(func),
                window_nanos: window.as_nanos().min(u64::MAX as u128) as u64,
                clock,
                state: Mutex::new(ThrottleState {
                    last_invocation: None,
                    pending_args: None,
                    timer: None,
                    epoch: 0,
                }),
            }),
        }
    }

    // accessor method to return the window
    pub fn window(&self) -> Duration {
        Duration::from_nanos(self.inner.window_nanos)
    }

    /// Call the throttled function.
    ///
    /// Fails if the clock cannot be read, or if a trailing invocation must be
    /// armed outside a tokio runtime. On failure the throttle state is left
    /// as it was before the call.
    pub fn call(&self, args: A) -> Result<ThrottleDecision, TempoError> {
        let now = self.inner.clock.now()?;
        let mut state = self.inner.state.lock();

        let elapsed = state.last_invocation.map(|last| now.saturating_sub(last));
        let window_open = elapsed.is_none_or(|elapsed| elapsed >= self.inner.window_nanos);

        if window_open {
            state.disarm();
            state.last_invocation = Some(now);
            drop(state);
            trace!("throttle invoking on leading edge");
            (self.inner.func)(args);
            return Ok(ThrottleDecision::Invoked);
        }

        if state.timer.is_some() {
            state.pending_args = Some(args);
            trace!("throttle coalesced call into pending trailing invocation");
            return Ok(ThrottleDecision::Coalesced);
        }

        let remaining = self.inner.window_nanos - elapsed.unwrap_or(0);
        let due = now.saturating_add(remaining);
        let epoch = state.epoch.wrapping_add(1);
        let inner = Arc::clone(&self.inner);
        let timer = ScheduledCall::schedule(Duration::from_nanos(remaining), move || {
            inner.fire(epoch, due);
        })?;

        state.epoch = epoch;
        state.pending_args = Some(args);
        state.timer = Some(timer);
        trace!(remaining_nanos = remaining, "throttle scheduled trailing invocation");
        Ok(ThrottleDecision::Scheduled {
            after: Duration::from_nanos(remaining),
        })
    }

    /// Drop any pending trailing invocation without running it.
    pub fn cancel(&self) {
        self.inner.state.lock().disarm();
    }

    /// Whether a trailing invocation is currently armed.
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }

    /// Clock reading of the last real invocation, if any.
    pub fn last_invocation_nanos(&self) -> Option<u64> {
        self.inner.state.lock().last_invocation
    }
}

impl<A, C> Inner<A, C>
where
    C: Clock,
{
    // trailing-edge invocation, run from the timer task
    fn fire(&self, epoch: u64, due: u64) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return;
        }
        state.timer = None;
        let Some(args) = state.pending_args.take() else {
            return;
        };
        let now = match self.clock.now() {
            Ok(now) => now,
            Err(error) => {
                warn!(%error, "clock failed during trailing invocation, using scheduled time");
                due
            }
        };
        state.last_invocation = Some(now);
        drop(state);
        trace!("throttle invoking on trailing edge");
        (self.func)(args);
    }
}

impl<A, C> fmt::Debug for Throttle<A, C>
where
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Throttle")
            .field("window_nanos", &self.inner.window_nanos)
            .field("last_invocation", &state.last_invocation)
            .field("pending", &state.timer.is_some())
            .finish()
    }
}
