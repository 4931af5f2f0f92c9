//! Sequential execution domains on top of a tokio runtime.
//!
//! A [`StrandExecutor`] runs everything posted to it, or fired from its
//! timers, one action at a time and in FIFO order, even when the runtime
//! polls tasks on several worker threads. Independent strands created with
//! [`fork`](StrandExecutor::fork) share the runtime but not the ordering
//! domain, so they run concurrently with each other.
//!
//! # Example
//!
//! ```rust
//! use exekit::runtime::strand::StrandExecutor;
//! use exekit::runtime::ExecutorExt;
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//!
//! let runtime = tokio::runtime::Builder::new_multi_thread()
//!     .worker_threads(2)
//!     .enable_all()
//!     .build()
//!     .unwrap();
//! let strand = runtime.block_on(async { StrandExecutor::try_current() }).unwrap();
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! for i in 0..10 {
//!     let log = Arc::clone(&log);
//!     strand.post_fn(move || log.lock().push(i));
//! }
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! strand.post_fn(move || {
//!     let _ = tx.send(());
//! });
//!
//! runtime.block_on(rx).unwrap();
//! assert_eq!(*log.lock(), (0..10).collect::<Vec<_>>());
//! ```

use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::tokio::TokioExecutor;
use super::{Action, Executor, TimeSource};
use crate::clock::Instant;
use crate::error::Result;
use crate::timer::TimerHandle;

thread_local! {
    /// Address of the strand whose action is running on this thread, or 0.
    static CURRENT_STRAND: Cell<usize> = const { Cell::new(0) };
}

/// Marks a strand as running on this thread until dropped.
struct EnterStrand(usize);

impl EnterStrand {
    fn enter(strand: &Arc<StrandInner>) -> Self {
        Self(CURRENT_STRAND.with(|current| current.replace(strand.key())))
    }
}

impl Drop for EnterStrand {
    fn drop(&mut self) {
        CURRENT_STRAND.with(|current| current.set(self.0));
    }
}

/// An [`Executor`] that never runs two of its actions at the same time.
///
/// Clones share the same ordering domain.
#[derive(Clone)]
pub struct StrandExecutor {
    inner: Arc<StrandInner>,
}

struct StrandInner {
    base: TokioExecutor,
    queue: Mutex<StrandQueue>,
}

#[derive(Default)]
struct StrandQueue {
    pending: VecDeque<Action>,
    /// A drain task is live and will pick up anything pushed to `pending`.
    draining: bool,
}

impl StrandInner {
    fn key(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }

    fn is_current(self: &Arc<Self>) -> bool {
        CURRENT_STRAND.with(Cell::get) == self.key()
    }

    fn dispatch(self: &Arc<Self>, action: Action) {
        if self.is_current() {
            action();
        } else {
            self.enqueue(action);
        }
    }

    fn enqueue(self: &Arc<Self>, action: Action) {
        let start_drain = {
            let mut queue = self.queue.lock();
            queue.pending.push_back(action);
            !std::mem::replace(&mut queue.draining, true)
        };
        if start_drain {
            self.spawn_drain();
        }
    }

    fn spawn_drain(self: &Arc<Self>) {
        let strand = Arc::clone(self);
        self.base.handle().spawn(strand.drain());
    }

    /// Pops the next action, or marks the strand idle when there is none.
    fn next_action(&self) -> Option<Action> {
        let mut queue = self.queue.lock();
        let next = queue.pending.pop_front();
        if next.is_none() {
            queue.draining = false;
        }
        next
    }

    async fn drain(self: Arc<Self>) {
        let _resume = ResumeOnPanic(Arc::clone(&self));
        while let Some(action) = self.next_action() {
            {
                let _entered = EnterStrand::enter(&self);
                action();
            }
            ::tokio::task::yield_now().await;
        }
    }
}

/// Hands the queue to a fresh drain task if an action panics mid-drain.
struct ResumeOnPanic(Arc<StrandInner>);

impl Drop for ResumeOnPanic {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        let respawn = {
            let mut queue = self.0.queue.lock();
            queue.draining = !queue.pending.is_empty();
            queue.draining
        };
        if respawn {
            self.0.spawn_drain();
        }
    }
}

impl StrandExecutor {
    /// Creates a strand that spawns onto `base`'s runtime and shares its time epoch.
    #[must_use]
    pub fn new(base: TokioExecutor) -> Self {
        Self {
            inner: Arc::new(StrandInner {
                base,
                queue: Mutex::new(StrandQueue::default()),
            }),
        }
    }

    /// Creates a strand on the runtime of the current context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RuntimeUnavailable`](crate::Error::RuntimeUnavailable)
    /// when called outside a tokio runtime.
    pub fn try_current() -> Result<Self> {
        TokioExecutor::try_current().map(Self::new)
    }

    /// Creates an independent strand on the same runtime and time epoch.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self::new(self.inner.base.clone())
    }

    /// Returns the underlying executor.
    #[must_use]
    pub fn base(&self) -> &TokioExecutor {
        &self.inner.base
    }

    /// Returns `true` when called from an action this strand is running.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.inner.is_current()
    }

    /// Runs `action` immediately if the caller is already running on this
    /// strand, otherwise posts it.
    pub fn dispatch(&self, action: Action) {
        self.inner.dispatch(action);
    }

    /// Returns an action that [dispatches](Self::dispatch) `action` onto this
    /// strand when invoked.
    #[must_use]
    pub fn wrap(&self, action: Action) -> Action {
        let strand = Arc::clone(&self.inner);
        Box::new(move || strand.dispatch(action))
    }

    /// Returns the number of actions queued and not yet started.
    #[must_use]
    pub fn num_queued(&self) -> usize {
        self.inner.queue.lock().pending.len()
    }
}

impl TimeSource for StrandExecutor {
    fn now(&self) -> Instant {
        self.inner.base.now()
    }
}

impl Executor for StrandExecutor {
    fn post(&self, action: Action) {
        trace!("action posted to strand");
        self.inner.enqueue(action);
    }

    fn schedule_at(&self, deadline: Instant, action: Action) -> TimerHandle {
        let strand = Arc::clone(&self.inner);
        // Cancellation is re-checked when the action reaches the head of the queue
        self.inner.base.start_timer(deadline, move |gate| {
            strand.enqueue(Box::new(move || {
                if gate.try_fire() {
                    action();
                }
            }));
        })
    }
}

impl fmt::Debug for StrandExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.inner.queue.lock();
        f.debug_struct("StrandExecutor")
            .field("queued", &queue.pending.len())
            .field("draining", &queue.draining)
            .finish_non_exhaustive()
    }
}
