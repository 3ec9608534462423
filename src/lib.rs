// src/lib.rs

//! # Flux Tempo
//!
//! Temporal coordination for async Rust: bounded-concurrency execution,
//! retry with exponential backoff, and throttle/debounce wrappers.
//!
//! Everything runs on tokio. "Parallel" here means interleaved on the
//! runtime; CPU-bound work inside an operation still blocks the others.
//!
//! ## Quick Example
//!
//! ```rust
//! use flux_tempo::{run_bounded, BoundedConfig};
//!
//! # let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
//! # runtime.block_on(async {
//! let config = BoundedConfig::new(2);
//! let doubled = run_bounded(vec![1, 2, 3, 4, 5], |x| async move {
//!     Ok::<_, std::convert::Infallible>(x * 2)
//! }, &config).await.unwrap();
//!
//! assert_eq!(doubled, vec![2, 4, 6, 8, 10]);
//! # });
//! ```
//!
//! ## Cancellation
//!
//! None of the components take cancellation tokens. Dropping a future
//! returned by [`retry`] or [`run_bounded`] drops the operations it owns;
//! trailing invocations armed by [`Throttle`] and [`Debounce`] keep running
//! until fired or explicitly cancelled.

// private modules
mod bounded;
mod clock;
mod config;
mod debounce;
mod delay;
mod errors;
mod pool;
mod retry;
mod throttle;

// public API exports
pub use bounded::{BoundedRunner, run_bounded};
pub use clock::{Clock, ClockError, MonotonicClock, SystemClock};
pub use config::{BoundedConfig, RetryConfig};
pub use debounce::{Debounce, DebounceDecision};
pub use delay::{ScheduledCall, delay};
pub use errors::{RetryError, RunError, TempoError};
pub use pool::ThrottlePool;
pub use retry::{Retrier, backoff_delay, retry};
pub use throttle::{Throttle, ThrottleDecision};
