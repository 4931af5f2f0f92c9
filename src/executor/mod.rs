//! Deterministic execution under virtual time
//!
//! This module provides [`TestExecutor`], an [`Executor`](crate::runtime::Executor)
//! whose clock only moves when a test says so. Posted actions and fired
//! timers wait in a FIFO ready queue; nothing runs until the test calls
//! [`run_one`](TestExecutor::run_one) or [`run_many`](TestExecutor::run_many).
//!
//! # Example
//!
//! ```rust
//! use exekit::executor::TestExecutor;
//! use exekit::runtime::ExecutorExt;
//! use std::time::Duration;
//!
//! let executor = TestExecutor::new();
//!
//! let timer = executor.schedule_fn(Duration::from_secs(5), || {});
//! executor.post_fn(|| {});
//!
//! assert_eq!(executor.num_active(), 1);
//! assert_eq!(executor.num_pending_timers(), 1);
//!
//! timer.cancel();
//! executor.advance_time(Duration::from_secs(5));
//! assert_eq!(executor.run_many(usize::MAX), 1);
//! assert_eq!(executor.num_timer_cancel(), 1);
//! ```

mod config;
mod task;
mod test_executor;

pub use config::ExecutorConfig;
pub use task::{spawn, TaskHandle, TaskId};
pub use test_executor::TestExecutor;

#[cfg(test)]
mod proptests;
