//! Tokio runtime integration for exekit.
//!
//! [`TokioExecutor`] satisfies the [`Executor`] contract by delegating to a
//! tokio runtime: `post` spawns the action and `schedule_at` spawns a task
//! that sleeps until the deadline. The spawned task owns the action, so
//! dropping the executor value while a timer is outstanding leaves nothing
//! dangling.
//!
//! Posted actions run in the order tokio's scheduler picks them, which is
//! FIFO on a current-thread runtime. Use
//! [`StrandExecutor`](super::strand::StrandExecutor) when actions must not
//! overlap on a multi-thread runtime.
//!
//! # Example
//!
//! ```rust
//! use exekit::runtime::tokio::TokioExecutor;
//! use exekit::runtime::ExecutorExt;
//! use std::time::Duration;
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_all()
//!     .build()
//!     .unwrap();
//! let executor = TokioExecutor::new(runtime.handle().clone());
//!
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! executor.schedule_fn(Duration::from_millis(5), move || {
//!     let _ = tx.send("fired");
//! });
//!
//! assert_eq!(runtime.block_on(rx).unwrap(), "fired");
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ::tokio::runtime::Handle;
use ::tokio::task::AbortHandle;
use tracing::{debug, trace};

use super::{Action, Executor, TimeSource};
use crate::clock::Instant;
use crate::error::{Error, Result};
use crate::timer::{TimerControl, TimerHandle, TimerId};

/// Deadlines beyond this horizon are clamped before handing them to tokio.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Decides the race between a timer firing and being cancelled.
#[derive(Debug)]
pub(crate) struct TimerGate {
    state: AtomicU8,
}

impl TimerGate {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
        }
    }

    /// Returns `true` if the caller won the right to run the action.
    pub(crate) fn try_fire(&self) -> bool {
        self.state
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn try_cancel(&self) -> bool {
        self.state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

struct TokioTimer {
    id: TimerId,
    deadline: Instant,
    gate: Arc<TimerGate>,
    sleeper: AbortHandle,
}

impl TimerControl for TokioTimer {
    fn id(&self) -> TimerId {
        self.id
    }

    fn expires_at(&self) -> Instant {
        self.deadline
    }

    fn cancel(&self) {
        if self.gate.try_cancel() {
            self.sleeper.abort();
            debug!(timer = %self.id, "timer cancelled");
        }
    }
}

/// An [`Executor`] backed by a tokio runtime.
///
/// Clones share the runtime handle, the time epoch and the timer ID sequence.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: Handle,
    epoch: ::tokio::time::Instant,
    next_timer_id: Arc<AtomicU64>,
}

impl TokioExecutor {
    /// Creates an executor that spawns onto `handle`.
    ///
    /// The executor's time epoch is the moment of creation.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            epoch: ::tokio::time::Instant::now(),
            next_timer_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates an executor on the runtime of the current context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RuntimeUnavailable`] when called outside a tokio runtime.
    pub fn try_current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| Error::runtime_unavailable(e.to_string()))
    }

    /// Returns the runtime handle actions are spawned onto.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawns a task that sleeps until `deadline` and then calls `on_expiry`
    /// with the timer's gate. `on_expiry` must consult the gate before
    /// running user code.
    pub(crate) fn start_timer<F>(&self, deadline: Instant, on_expiry: F) -> TimerHandle
    where
        F: FnOnce(Arc<TimerGate>) + Send + 'static,
    {
        let id = TimerId::new(self.next_timer_id.fetch_add(1, Ordering::Relaxed));
        let when = self
            .epoch
            .checked_add(deadline.as_duration())
            .unwrap_or_else(|| ::tokio::time::Instant::now() + FAR_FUTURE);

        let gate = Arc::new(TimerGate::new());
        let fire_gate = Arc::clone(&gate);
        let sleeper = self.handle.spawn(async move {
            ::tokio::time::sleep_until(when).await;
            on_expiry(fire_gate);
        });
        trace!(timer = %id, %deadline, "timer scheduled");

        TimerHandle::new(Arc::new(TokioTimer {
            id,
            deadline,
            gate,
            sleeper: sleeper.abort_handle(),
        }))
    }
}

impl TimeSource for TokioExecutor {
    fn now(&self) -> Instant {
        Instant::from_duration(::tokio::time::Instant::now().saturating_duration_since(self.epoch))
    }
}

impl Executor for TokioExecutor {
    fn post(&self, action: Action) {
        trace!("action posted");
        self.handle.spawn(async move { action() });
    }

    fn schedule_at(&self, deadline: Instant, action: Action) -> TimerHandle {
        self.start_timer(deadline, move |gate| {
            if gate.try_fire() {
                action();
            }
        })
    }
}

impl fmt::Debug for TokioExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioExecutor")
            .field("now", &self.now())
            .field("timers_started", &self.next_timer_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
