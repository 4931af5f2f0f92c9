//! Timeout future built from an executor timer.

use pin_project::pin_project;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use super::{Delay, Instant};
use crate::error::{Error, Result};

/// Races a future against an executor timer.
///
/// Created by [`ExecutorExt::timeout`](crate::runtime::ExecutorExt::timeout).
/// Resolves to `Ok(output)` if the inner future finishes first, cancelling
/// the timer on the spot, or to [`Error::Timeout`] if the timer fires first.
///
/// # Example
///
/// ```rust
/// use exekit::executor::TestExecutor;
/// use exekit::runtime::ExecutorExt;
/// use exekit::Error;
/// use std::time::Duration;
///
/// let executor = TestExecutor::new();
/// let inner = executor.clone();
/// let result = executor
///     .block_on(async move {
///         inner
///             .timeout(Duration::from_secs(30), std::future::pending::<()>())
///             .await
///     })
///     .unwrap();
///
/// assert_eq!(result, Err(Error::Timeout(Duration::from_secs(30))));
/// ```
#[pin_project]
#[must_use = "futures do nothing unless polled"]
pub struct Timeout<F> {
    #[pin]
    future: F,
    delay: Delay,
    duration: Duration,
}

impl<F> Timeout<F> {
    pub(crate) fn new(future: F, duration: Duration, delay: Delay) -> Self {
        Self {
            future,
            delay,
            duration,
        }
    }

    /// Returns the instant at which the timeout expires.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.delay.deadline()
    }

    /// Returns the wrapped future.
    pub fn into_inner(self) -> F {
        self.future
    }
}

impl<F: Future> Future for Timeout<F> {
    type Output = Result<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if let Poll::Ready(output) = this.future.poll(cx) {
            this.delay.cancel();
            return Poll::Ready(Ok(output));
        }

        match Pin::new(this.delay).poll(cx) {
            Poll::Ready(()) => Poll::Ready(Err(Error::Timeout(*this.duration))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<F> fmt::Debug for Timeout<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("duration", &self.duration)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
