//! Timer-backed delay future.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use parking_lot::Mutex;

use super::Instant;
use crate::runtime::Executor;
use crate::timer::TimerHandle;

#[derive(Debug, Default)]
struct DelayState {
    fired: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

impl DelayState {
    fn fire(&self) {
        self.fired.store(true, Ordering::Release);
        let waker = self.waker.lock().take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// A future that completes when its executor timer fires.
///
/// Created by [`ExecutorExt::delay`](crate::runtime::ExecutorExt::delay).
/// The timer is registered on creation, not on first poll. Dropping a `Delay`
/// that has not fired cancels its timer.
///
/// # Example
///
/// ```rust
/// use exekit::executor::TestExecutor;
/// use exekit::runtime::ExecutorExt;
/// use std::time::Duration;
///
/// let executor = TestExecutor::new();
/// let delay = executor.delay(Duration::from_secs(10));
///
/// assert_eq!(delay.deadline().as_duration(), Duration::from_secs(10));
/// assert!(!delay.is_elapsed());
///
/// executor.advance_time(Duration::from_secs(10));
/// executor.run_many(usize::MAX);
/// assert!(delay.is_elapsed());
/// ```
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Delay {
    timer: TimerHandle,
    state: Arc<DelayState>,
}

impl Delay {
    pub(crate) fn new<E: Executor + ?Sized>(executor: &E, duration: Duration) -> Self {
        let state = Arc::new(DelayState::default());
        let fire = Arc::clone(&state);
        let timer = executor.schedule(duration, Box::new(move || fire.fire()));
        Self { timer, state }
    }

    /// Returns the deadline for this delay.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.timer.expires_at()
    }

    /// Returns `true` once the timer has fired.
    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        self.state.is_fired()
    }

    /// Returns the underlying timer.
    #[must_use]
    pub fn timer(&self) -> &TimerHandle {
        &self.timer
    }

    /// Cancels the timer; the delay will then never complete.
    pub fn cancel(&self) {
        self.timer.cancel();
    }
}

impl Future for Delay {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.state.is_fired() {
            return Poll::Ready(());
        }

        *self.state.waker.lock() = Some(cx.waker().clone());

        // The timer may have fired between the check and storing the waker
        if self.state.is_fired() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl Drop for Delay {
    fn drop(&mut self) {
        if !self.is_elapsed() {
            self.timer.cancel();
        }
    }
}
