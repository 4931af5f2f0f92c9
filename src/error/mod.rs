//! Error definitions
//!
//! The scheduling core is infallible: posting, scheduling and cancelling never
//! fail. Errors only surface from the helpers layered on top of it.

use std::time::Duration;

use thiserror::Error;

/// Main error type for exekit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A [`Timeout`](crate::clock::Timeout) expired before its future completed.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A future driven by [`TestExecutor::block_on`](crate::executor::TestExecutor::block_on)
    /// can make no further progress.
    #[error("Future stalled: no ready work and no pending timers")]
    Stalled,

    /// No async runtime is available in the current context.
    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

impl Error {
    /// Create a runtime unavailable error.
    #[must_use]
    pub fn runtime_unavailable(message: impl Into<String>) -> Self {
        Self::RuntimeUnavailable(message.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
