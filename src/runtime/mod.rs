//! Runtime-agnostic executor abstractions.
//!
//! This module defines the contract through which code schedules immediate
//! and time-delayed work without depending on a specific event loop.
//!
//! # Core Traits
//!
//! - [`TimeSource`] - Read-only access to "now"
//! - [`Executor`] - `post`, `schedule` and `schedule_at` on top of a time source
//! - [`ExecutorExt`] - Closure and future conveniences for every executor
//!
//! # Implementations
//!
//! - [`TestExecutor`](crate::executor::TestExecutor) - Deterministic virtual time
//! - `TokioExecutor` - Delegates to a tokio runtime (with `tokio` feature)
//! - `StrandExecutor` - Sequential execution domain on a tokio runtime (with `tokio` feature)
//!
//! # Example
//!
//! ```rust
//! use exekit::executor::TestExecutor;
//! use exekit::runtime::{Executor, ExecutorExt};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn start_heartbeat(executor: &dyn Executor, beats: Arc<AtomicUsize>) {
//!     executor.schedule(
//!         Duration::from_secs(1),
//!         Box::new(move || {
//!             beats.fetch_add(1, Ordering::SeqCst);
//!         }),
//!     );
//! }
//!
//! let executor = TestExecutor::new();
//! let beats = Arc::new(AtomicUsize::new(0));
//! start_heartbeat(&executor, Arc::clone(&beats));
//!
//! executor.advance_time(Duration::from_secs(1));
//! executor.run_many(usize::MAX);
//! assert_eq!(beats.load(Ordering::SeqCst), 1);
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Delay, Instant, Timeout};
use crate::timer::TimerHandle;

/// A zero-argument unit of deferred work, invoked at most once.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// A source of monotonic time.
pub trait TimeSource: Send + Sync {
    /// Returns the present time. Never blocks.
    fn now(&self) -> Instant;
}

/// Schedules immediate and delayed work.
///
/// Implementations guarantee that actions handed to [`post`](Executor::post)
/// or fired from timers are never dropped while the executor is live, never
/// run more than once, and never run before they are enqueued.
pub trait Executor: TimeSource {
    /// Enqueues `action` for asynchronous execution.
    ///
    /// Posted actions run in FIFO order relative to each other and to timers
    /// that had already fired when `post` was called.
    fn post(&self, action: Action);

    /// Registers `action` to run once `deadline` has been reached.
    ///
    /// Returns immediately without running `action`.
    fn schedule_at(&self, deadline: Instant, action: Action) -> TimerHandle;

    /// Registers `action` to run after `delay` has elapsed.
    ///
    /// Equivalent to `schedule_at(now + delay, action)`. A delay too large to
    /// represent yields [`Instant::MAX`] as the deadline.
    fn schedule(&self, delay: Duration, action: Action) -> TimerHandle {
        self.schedule_at(self.now().saturating_add(delay), action)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn post(&self, action: Action) {
        (**self).post(action);
    }

    fn schedule_at(&self, deadline: Instant, action: Action) -> TimerHandle {
        (**self).schedule_at(deadline, action)
    }

    fn schedule(&self, delay: Duration, action: Action) -> TimerHandle {
        (**self).schedule(delay, action)
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn post(&self, action: Action) {
        (**self).post(action);
    }

    fn schedule_at(&self, deadline: Instant, action: Action) -> TimerHandle {
        (**self).schedule_at(deadline, action)
    }

    fn schedule(&self, delay: Duration, action: Action) -> TimerHandle {
        (**self).schedule(delay, action)
    }
}

/// Conveniences available on every [`Executor`].
pub trait ExecutorExt: Executor {
    /// Posts a closure without boxing it at the call site.
    fn post_fn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post(Box::new(f));
    }

    /// Schedules a closure to run after `delay`.
    fn schedule_fn<F>(&self, delay: Duration, f: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule(delay, Box::new(f))
    }

    /// Schedules a closure to run at `deadline`.
    fn schedule_at_fn<F>(&self, deadline: Instant, f: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_at(deadline, Box::new(f))
    }

    /// Returns a future that completes once `duration` has elapsed on this executor.
    fn delay(&self, duration: Duration) -> Delay {
        Delay::new(self, duration)
    }

    /// Races `future` against a timer of `duration` on this executor.
    fn timeout<F: Future>(&self, duration: Duration, future: F) -> Timeout<F> {
        Timeout::new(future, duration, self.delay(duration))
    }
}

impl<E: Executor + ?Sized> ExecutorExt for E {}

#[cfg(feature = "tokio")]
pub mod tokio;

#[cfg(feature = "tokio")]
pub mod strand;
