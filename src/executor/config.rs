//! Configuration for [`TestExecutor`](super::TestExecutor).

use std::time::Duration;

/// Configuration for a [`TestExecutor`](super::TestExecutor).
///
/// # Example
///
/// ```rust
/// use exekit::executor::{ExecutorConfig, TestExecutor};
/// use std::time::Duration;
///
/// let executor = TestExecutor::with_config(
///     ExecutorConfig::new()
///         .start_time(Duration::from_secs(100))
///         .name("link-layer"),
/// );
///
/// assert_eq!(executor.name(), Some("link-layer"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Initial value of the virtual clock.
    pub start_time: Duration,
    /// Label used in `Debug` output and log events.
    pub name: Option<String>,
}

impl ExecutorConfig {
    /// Create a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial time.
    #[must_use]
    pub fn start_time(mut self, time: Duration) -> Self {
        self.start_time = time;
        self
    }

    /// Set the executor name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
