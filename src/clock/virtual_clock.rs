//! `VirtualClock` implementation for simulated time.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::Instant;
use crate::runtime::TimeSource;

/// A simulated monotonic clock owned by a [`TestExecutor`].
///
/// Callers can only read the clock. Time moves exclusively through the
/// executor's time-control operations
/// ([`advance_time`](crate::executor::TestExecutor::advance_time),
/// [`add_time`](crate::executor::TestExecutor::add_time) and
/// [`advance_to_next_timer`](crate::executor::TestExecutor::advance_to_next_timer)),
/// never through `post` or `schedule`.
///
/// # Thread Safety
///
/// `VirtualClock` is cheap to clone and all clones observe the same time.
/// Each executor owns its own clock, so independent executors never interfere.
///
/// # Example
///
/// ```rust
/// use exekit::clock::Instant;
/// use exekit::executor::TestExecutor;
/// use std::time::Duration;
///
/// let executor = TestExecutor::new();
/// let clock = executor.clock();
/// assert_eq!(clock.now(), Instant::ZERO);
///
/// executor.advance_time(Duration::from_secs(10));
/// assert_eq!(clock.now().as_duration(), Duration::from_secs(10));
/// ```
///
/// [`TestExecutor`]: crate::executor::TestExecutor
#[derive(Debug, Clone)]
pub struct VirtualClock {
    current_time: Arc<Mutex<Instant>>,
}

impl VirtualClock {
    pub(crate) fn with_start_time(start: Duration) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(Instant::from_duration(start))),
        }
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Instant {
        *self.current_time.lock()
    }

    /// Moves the clock forward by `duration` and returns the new time.
    pub(crate) fn advance(&self, duration: Duration) -> Instant {
        let mut current = self.current_time.lock();
        *current = current.saturating_add(duration);
        *current
    }

    /// Moves the clock to `time` if it lies in the future.
    ///
    /// Returns `true` if the clock moved.
    pub(crate) fn advance_to(&self, time: Instant) -> bool {
        let mut current = self.current_time.lock();
        if time > *current {
            *current = time;
            true
        } else {
            false
        }
    }
}

impl TimeSource for VirtualClock {
    fn now(&self) -> Instant {
        VirtualClock::now(self)
    }
}
