//! Cancellable timer handles.
//!
//! Every call to [`Executor::schedule`](crate::runtime::Executor::schedule) or
//! [`Executor::schedule_at`](crate::runtime::Executor::schedule_at) returns a
//! [`TimerHandle`]. The handle and the executor both refer to the same pending
//! timer by identity, so cancelling through any clone of the handle affects the
//! one timer it was created for.
//!
//! A timer moves from *pending* to exactly one of two terminal states:
//! *fired* (its deadline was reached and its action was queued) or
//! *cancelled*. Cancelling a timer that already reached a terminal state is a
//! no-op, because "cancel after it already ran" is a normal race in
//! asynchronous code.
//!
//! Dropping every handle without calling [`TimerHandle::cancel`] leaves the
//! timer pending; it still fires at its deadline.

use std::fmt;
use std::sync::Arc;

use crate::clock::Instant;

/// Identity of a timer, unique within the executor that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timer({})", self.0)
    }
}

/// Executor-side operations behind a [`TimerHandle`].
pub(crate) trait TimerControl: Send + Sync {
    fn id(&self) -> TimerId;

    fn expires_at(&self) -> Instant;

    /// Prevents the timer from firing if it is still pending.
    fn cancel(&self);
}

/// Handle to a scheduled timer.
///
/// # Example
///
/// ```rust
/// use exekit::executor::TestExecutor;
/// use exekit::runtime::ExecutorExt;
/// use std::time::Duration;
///
/// let executor = TestExecutor::new();
/// let timer = executor.schedule_fn(Duration::from_secs(5), || unreachable!());
///
/// timer.cancel();
/// timer.cancel(); // no-op
///
/// executor.advance_time(Duration::from_secs(5));
/// assert_eq!(executor.run_many(usize::MAX), 0);
/// assert_eq!(executor.num_timer_cancel(), 1);
/// assert_eq!(timer.expires_at().as_duration(), Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct TimerHandle {
    inner: Arc<dyn TimerControl>,
}

impl TimerHandle {
    pub(crate) fn new(inner: Arc<dyn TimerControl>) -> Self {
        Self { inner }
    }

    /// Returns the timer's identity.
    #[must_use]
    pub fn id(&self) -> TimerId {
        self.inner.id()
    }

    /// Returns the deadline the timer was scheduled for.
    ///
    /// The deadline is reported regardless of whether the timer is still
    /// pending, has fired, or was cancelled.
    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.inner.expires_at()
    }

    /// Cancels the timer if it has not fired yet.
    ///
    /// Idempotent. An action that has already started running is not
    /// interrupted.
    pub fn cancel(&self) {
        self.inner.cancel();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id())
            .field("expires_at", &self.expires_at())
            .finish()
    }
}
