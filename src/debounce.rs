// src/debounce.rs

// debounce: collapse a burst of calls into a single invocation on the
// leading or trailing edge

// dependencies
use crate::delay::ScheduledCall;
use crate::errors::TempoError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// What a call to a debounced function did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceDecision {
    /// Leading edge: the function ran immediately with this call's arguments.
    Invoked,
    /// The quiet-period timer was (re)armed.
    Deferred,
}

/// Wraps a function so that a burst of calls produces exactly one invocation.
///
/// Every call restarts a `window` long quiet-period timer. In trailing mode
/// (the default) the function runs when the timer expires, with the
/// arguments of the last call. In leading mode (`immediate`) the first call
/// of a burst runs the function at once and the timer only marks the end of
/// the burst.
///
/// Trailing invocations run on a spawned tokio task; a panic there unwinds
/// that task only and is not reported to callers.
pub struct Debounce<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    func: Box<dyn Fn(A) + Send + Sync>,
    window: Duration,
    immediate: bool,
    state: Mutex<DebounceState<A>>,
}

struct DebounceState<A> {
    pending_args: Option<A>,
    timer: Option<ScheduledCall>,
    epoch: u64,
}

impl<A> Debounce<A>
where
    A: Send + 'static,
{
    /// Debounce `func` on the trailing edge.
    pub fn new<F>(func: F, window: Duration) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_edge(func, window, false)
    }

    /// Debounce `func` on the leading edge.
    pub fn immediate<F>(func: F, window: Duration) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_edge(func, window, true)
    }

    /// Debounce `func`, firing on the leading edge when `immediate` is set.
    pub fn with_edge<F>(func: F, window: Duration, immediate: bool) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                func: Box::new(func),
                window,
                immediate,
                state: Mutex::new(DebounceState {
                    pending_args: None,
                    timer: None,
                    epoch: 0,
                }),
            }),
        }
    }

    // accessor method to return the window
    pub fn window(&self) -> Duration {
        self.inner.window
    }

    // accessor method to return the edge selection
    pub fn is_immediate(&self) -> bool {
        self.inner.immediate
    }

    /// Call the debounced function.
    ///
    /// Fails only if the quiet-period timer cannot be armed because there is
    /// no tokio runtime; the previous timer is left untouched in that case.
    pub fn call(&self, args: A) -> Result<DebounceDecision, TempoError> {
        let mut state = self.inner.state.lock();
        let call_now = self.inner.immediate && state.timer.is_none();

        let epoch = state.epoch.wrapping_add(1);
        let inner = Arc::clone(&self.inner);
        let timer = ScheduledCall::schedule(self.inner.window, move || inner.fire(epoch))?;

        if let Some(previous) = state.timer.replace(timer) {
            previous.cancel();
        }
        state.epoch = epoch;

        if call_now {
            state.pending_args = None;
            drop(state);
            trace!("debounce invoking on leading edge");
            (self.inner.func)(args);
            return Ok(DebounceDecision::Invoked);
        }

        if !self.inner.immediate {
            state.pending_args = Some(args);
        }
        trace!("debounce deferred call");
        Ok(DebounceDecision::Deferred)
    }

    /// Drop the pending invocation and end the current burst.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }
        state.pending_args = None;
        state.epoch = state.epoch.wrapping_add(1);
    }

    /// Whether a burst is in progress (a quiet-period timer is armed).
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }
}

impl<A> Inner<A> {
    fn fire(&self, epoch: u64) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return;
        }
        state.timer = None;
        let Some(args) = state.pending_args.take() else {
            return;
        };
        drop(state);
        trace!("debounce invoking on trailing edge");
        (self.func)(args);
    }
}

impl<A> fmt::Debug for Debounce<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounce")
            .field("window", &self.inner.window)
            .field("immediate", &self.inner.immediate)
            .field("pending", &self.inner.state.lock().timer.is_some())
            .finish()
    }
}
