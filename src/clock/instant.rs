//! Opaque monotonic instants.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::time::Duration;

use crate::runtime::TimeSource;

/// A point in monotonic time, measured from an executor-specific epoch.
///
/// `Instant` mirrors the API of [`std::time::Instant`] but is produced by a
/// [`TimeSource`]. For the [`TestExecutor`](crate::executor::TestExecutor) the
/// epoch is virtual time zero; for reactor-backed executors it is the moment
/// the executor was created. Instants taken from unrelated time sources are
/// not comparable in any meaningful way.
///
/// # Example
///
/// ```rust
/// use exekit::clock::Instant;
/// use exekit::executor::TestExecutor;
/// use std::time::Duration;
///
/// let executor = TestExecutor::new();
/// let start = Instant::now(&executor);
///
/// executor.advance_time(Duration::from_secs(10));
/// let end = Instant::now(&executor);
///
/// assert_eq!(end.duration_since(start), Duration::from_secs(10));
/// assert_eq!(start.elapsed(&executor), Duration::from_secs(10));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    inner: Duration,
}

impl Instant {
    /// The epoch of a time source.
    pub const ZERO: Instant = Instant {
        inner: Duration::ZERO,
    };

    /// The latest representable instant.
    pub const MAX: Instant = Instant {
        inner: Duration::MAX,
    };

    /// Returns the current time of `source` as an `Instant`.
    #[must_use]
    pub fn now<S: TimeSource + ?Sized>(source: &S) -> Self {
        source.now()
    }

    /// Returns the amount of time elapsed from another instant to this one.
    ///
    /// # Panics
    ///
    /// Panics if `earlier` is later than `self`.
    #[must_use]
    pub fn duration_since(&self, earlier: Instant) -> Duration {
        self.checked_duration_since(earlier)
            .expect("earlier instant is later than self")
    }

    /// Returns the amount of time elapsed from another instant to this one,
    /// or `None` if that instant is later than this one.
    ///
    /// # Example
    ///
    /// ```rust
    /// use exekit::clock::Instant;
    /// use std::time::Duration;
    ///
    /// let earlier = Instant::from_duration(Duration::from_secs(1));
    /// let later = Instant::from_duration(Duration::from_secs(6));
    ///
    /// assert_eq!(later.checked_duration_since(earlier), Some(Duration::from_secs(5)));
    /// assert_eq!(earlier.checked_duration_since(later), None);
    /// ```
    #[must_use]
    pub fn checked_duration_since(&self, earlier: Instant) -> Option<Duration> {
        self.inner.checked_sub(earlier.inner)
    }

    /// Returns the amount of time elapsed from another instant to this one,
    /// or zero if that instant is later than this one.
    #[must_use]
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        self.checked_duration_since(earlier)
            .unwrap_or(Duration::ZERO)
    }

    /// Returns the amount of time elapsed on `source` since this instant.
    ///
    /// Returns zero if `source` reports a time before this instant.
    #[must_use]
    pub fn elapsed<S: TimeSource + ?Sized>(&self, source: &S) -> Duration {
        source.now().saturating_duration_since(*self)
    }

    /// Returns `self + duration`, or `None` on overflow.
    #[must_use]
    pub fn checked_add(&self, duration: Duration) -> Option<Instant> {
        self.inner
            .checked_add(duration)
            .map(|d| Instant { inner: d })
    }

    /// Returns `self + duration`, clamped to [`Instant::MAX`].
    #[must_use]
    pub fn saturating_add(&self, duration: Duration) -> Instant {
        Instant {
            inner: self.inner.saturating_add(duration),
        }
    }

    /// Returns `self - duration`, or `None` if the result would precede the epoch.
    #[must_use]
    pub fn checked_sub(&self, duration: Duration) -> Option<Instant> {
        self.inner
            .checked_sub(duration)
            .map(|d| Instant { inner: d })
    }

    /// Returns the offset from the epoch.
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        self.inner
    }

    /// Creates an `Instant` at `duration` past the epoch.
    ///
    /// This is the inverse of [`as_duration`](Self::as_duration).
    #[must_use]
    pub const fn from_duration(duration: Duration) -> Self {
        Self { inner: duration }
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T+{:?}", self.inner)
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, other: Duration) -> Instant {
        self.checked_add(other)
            .expect("overflow when adding duration to instant")
    }
}

impl AddAssign<Duration> for Instant {
    fn add_assign(&mut self, other: Duration) {
        *self = *self + other;
    }
}

impl Sub<Duration> for Instant {
    type Output = Instant;

    fn sub(self, other: Duration) -> Instant {
        self.checked_sub(other)
            .expect("overflow when subtracting duration from instant")
    }
}

impl SubAssign<Duration> for Instant {
    fn sub_assign(&mut self, other: Duration) {
        *self = *self - other;
    }
}

impl Sub<Instant> for Instant {
    type Output = Duration;

    fn sub(self, other: Instant) -> Duration {
        self.duration_since(other)
    }
}
