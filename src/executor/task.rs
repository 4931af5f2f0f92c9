//! Futures polled by posted actions.
//!
//! [`spawn`] turns any [`Executor`] into a minimal future runner: each wake-up
//! posts one action that polls the task, so futures advance exactly when the
//! executor runs that action. On a [`TestExecutor`](super::TestExecutor) this
//! means futures only make progress while the test drives the executor.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Wake, Waker};

use parking_lot::Mutex;
use tracing::trace;

use crate::runtime::Executor;

/// Unique identifier for a spawned task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Creates a new unique task ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Handle to a spawned task.
///
/// This handle can be used to check the task's status or retrieve its result.
pub struct TaskHandle<T> {
    /// The task's unique identifier.
    pub id: TaskId,
    /// Shared state for retrieving the result.
    result: Arc<Mutex<Option<T>>>,
}

impl<T> TaskHandle<T> {
    /// Creates a new task handle.
    pub(crate) fn new(id: TaskId, result: Arc<Mutex<Option<T>>>) -> Self {
        Self { id, result }
    }

    /// Tries to get the result if the task has completed.
    ///
    /// Returns `None` if the task hasn't completed yet.
    #[must_use]
    pub fn try_get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.result.lock().clone()
    }

    /// Takes the result if the task has completed.
    ///
    /// Returns `None` if the task hasn't completed yet or the result was already taken.
    #[must_use]
    pub fn take(&self) -> Option<T> {
        self.result.lock().take()
    }

    /// Returns true if the task has completed and its result has not been taken.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.result.lock().is_some()
    }
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            result: Arc::clone(&self.result),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("is_complete", &self.is_complete())
            .finish_non_exhaustive()
    }
}

/// Type-erased boxed future.
type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

enum TaskState {
    Idle(BoxFuture),
    /// Taken out for polling. `woken` records polls requested meanwhile.
    Polling { woken: bool },
    Done,
}

struct Task<E> {
    id: TaskId,
    state: Mutex<TaskState>,
    executor: E,
    /// Set while a poll action sits in the executor's queue.
    scheduled: AtomicBool,
}

impl<E: Executor + 'static> Task<E> {
    fn schedule(self: &Arc<Self>) {
        if !self.scheduled.swap(true, Ordering::AcqRel) {
            let task = Arc::clone(self);
            self.executor.post(Box::new(move || task.run()));
        }
    }

    fn run(self: Arc<Self>) {
        self.scheduled.store(false, Ordering::Release);

        // The lock is released before polling; the future may drive the
        // executor, which can run this task's next poll action.
        let mut future = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, TaskState::Polling { woken: false }) {
                TaskState::Idle(future) => future,
                TaskState::Polling { .. } => {
                    *state = TaskState::Polling { woken: true };
                    return;
                }
                TaskState::Done => {
                    *state = TaskState::Done;
                    return;
                }
            }
        };

        let waker = Waker::from(Arc::clone(&self));
        let mut cx = Context::from_waker(&waker);
        let ready = future.as_mut().poll(&mut cx).is_ready();

        let repoll = {
            let mut state = self.state.lock();
            let woken = matches!(*state, TaskState::Polling { woken: true });
            if ready {
                *state = TaskState::Done;
                false
            } else {
                *state = TaskState::Idle(future);
                woken
            }
        };

        if ready {
            trace!(task = %self.id, "task complete");
        } else if repoll {
            self.schedule();
        }
    }
}

impl<E: Executor + 'static> Wake for Task<E> {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.schedule();
    }
}

/// Spawns `future` onto `executor`.
///
/// The first poll is posted immediately; later polls are posted whenever the
/// future's waker fires, with at most one poll queued at a time.
///
/// A task whose waker is held by a pending timer keeps the executor alive
/// until that timer fires or is cancelled.
///
/// # Example
///
/// ```rust
/// use exekit::executor::{spawn, TestExecutor};
///
/// let executor = TestExecutor::new();
/// let handle = spawn(&executor, async { 1 + 1 });
///
/// assert!(!handle.is_complete());
/// executor.run_one();
/// assert_eq!(handle.take(), Some(2));
/// ```
pub fn spawn<E, F>(executor: &E, future: F) -> TaskHandle<F::Output>
where
    E: Executor + Clone + 'static,
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let id = TaskId::new();
    let result_slot = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&result_slot);

    // Wrap the future to store the result when complete
    let wrapped = async move {
        let output = future.await;
        *slot.lock() = Some(output);
    };

    let task = Arc::new(Task {
        id,
        state: Mutex::new(TaskState::Idle(Box::pin(wrapped))),
        executor: executor.clone(),
        scheduled: AtomicBool::new(false),
    });
    trace!(task = %id, "task spawned");
    task.schedule();

    TaskHandle::new(id, result_slot)
}
