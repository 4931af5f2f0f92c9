//! # exekit
//!
//! > One executor contract, a deterministic engine to test it with
//!
//! **exekit** defines a small interface for scheduling immediate work
//! ([`post`](runtime::Executor::post)) and delayed work
//! ([`schedule`](runtime::Executor::schedule)) without tying code to a
//! specific event loop, plus a virtual-time implementation of that interface
//! that makes timing-dependent code fully reproducible under test.
//!
//! ## Quick Start
//!
//! ```rust
//! use exekit::prelude::*;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let executor = TestExecutor::new();
//! let fired = Arc::new(AtomicBool::new(false));
//!
//! let flag = Arc::clone(&fired);
//! executor.schedule_fn(Duration::from_secs(30), move || flag.store(true, Ordering::SeqCst));
//!
//! executor.advance_time(Duration::from_secs(30)); // Instant, no real waiting
//! executor.run_many(usize::MAX);
//! assert!(fired.load(Ordering::SeqCst));
//! ```
//!
//! ## Features
//!
//! - **Executor contract** - [`TimeSource`](runtime::TimeSource),
//!   [`Executor`](runtime::Executor) and cancellable [`TimerHandle`](timer::TimerHandle)s
//! - **Deterministic engine** - [`TestExecutor`](executor::TestExecutor) with a
//!   virtual clock, FIFO ready queue and explicit time control
//! - **Futures** - [`spawn`](executor::spawn), [`Delay`](clock::Delay) and
//!   [`Timeout`](clock::Timeout) on any executor
//! - **Tokio backing** (`tokio` feature) - `TokioExecutor` and the sequential
//!   `StrandExecutor`
//! - **Test macro** (`macros` feature) - `#[exekit::test]` injects a `TestExecutor`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Time primitives: instants, the virtual clock and timer-backed futures
pub mod clock;

pub mod error;
pub mod executor;
pub mod runtime;
pub mod timer;

/// Prelude for convenient imports
///
/// ```rust
/// use exekit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::{Delay, Instant, Timeout, VirtualClock};
    pub use crate::error::{Error, Result};
    pub use crate::executor::{spawn, ExecutorConfig, TaskHandle, TaskId, TestExecutor};
    pub use crate::runtime::{Action, Executor, ExecutorExt, TimeSource};
    pub use crate::timer::{TimerHandle, TimerId};
}

// Re-exports
pub use error::{Error, Result};

// Re-export the test macro when macros feature is enabled
#[cfg(feature = "macros")]
pub use exekit_macros::test;
