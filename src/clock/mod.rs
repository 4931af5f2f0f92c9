//! Time primitives shared by every executor
//!
//! - [`Instant`] - an opaque, totally ordered point in monotonic time
//! - [`VirtualClock`] - the read-only clock owned by a
//!   [`TestExecutor`](crate::executor::TestExecutor)
//! - [`Delay`] and [`Timeout`] - futures built on top of executor timers
//!
//! # Example
//!
//! ```rust
//! use exekit::clock::Instant;
//! use exekit::executor::TestExecutor;
//! use std::time::Duration;
//!
//! let executor = TestExecutor::new();
//! let clock = executor.clock();
//! assert_eq!(clock.now(), Instant::ZERO);
//!
//! executor.advance_time(Duration::from_secs(10));
//! assert_eq!(clock.now(), Instant::from_duration(Duration::from_secs(10)));
//! ```

mod delay;
mod instant;
mod timeout;
mod virtual_clock;

pub use delay::Delay;
pub use instant::Instant;
pub use timeout::Timeout;
pub use virtual_clock::VirtualClock;
