//! The `TestExecutor` implementation.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::clock::{Instant, VirtualClock};
use crate::error::{Error, Result};
use crate::executor::config::ExecutorConfig;
use crate::executor::task::{self, TaskHandle};
use crate::runtime::{Action, Executor, TimeSource};
use crate::timer::{TimerControl, TimerHandle, TimerId};

/// A deterministic executor driven by virtual time.
///
/// Nothing runs on its own. Posted actions wait in a FIFO ready queue and
/// timers wait in a pending set until the test drives the executor with
/// [`run_one`], [`run_many`], [`advance_time`] or [`advance_to_next_timer`].
/// Every action is invoked synchronously on the calling thread.
///
/// Actions may call back into the executor (`post`, `schedule`, cancelling
/// other timers). Such effects are visible to subsequent steps, never to the
/// step currently running.
///
/// # Example
///
/// ```rust
/// use exekit::executor::TestExecutor;
/// use exekit::runtime::ExecutorExt;
/// use parking_lot::Mutex;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let executor = TestExecutor::new();
/// let log = Arc::new(Mutex::new(Vec::new()));
///
/// let a = Arc::clone(&log);
/// executor.schedule_fn(Duration::from_secs(10), move || a.lock().push("A"));
/// let b = Arc::clone(&log);
/// executor.post_fn(move || b.lock().push("B"));
///
/// // B is ready, A is not due yet
/// assert!(executor.run_one());
/// assert!(!executor.run_one());
///
/// assert_eq!(executor.advance_time(Duration::from_secs(10)), 1);
/// assert!(executor.run_one());
/// assert_eq!(*log.lock(), vec!["B", "A"]);
/// ```
///
/// [`run_one`]: TestExecutor::run_one
/// [`run_many`]: TestExecutor::run_many
/// [`advance_time`]: TestExecutor::advance_time
/// [`advance_to_next_timer`]: TestExecutor::advance_to_next_timer
#[derive(Clone)]
pub struct TestExecutor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    clock: VirtualClock,
    state: Mutex<EngineState>,
    name: Option<String>,
}

struct EngineState {
    /// Actions ready to run, in submission order.
    ready_queue: VecDeque<Action>,
    /// Timers that have neither fired nor been cancelled.
    timers: Vec<PendingTimer>,
    next_timer_id: u64,
    /// Diagnostic only.
    num_timer_cancel: usize,
}

struct PendingTimer {
    id: TimerId,
    deadline: Instant,
    action: Action,
}

impl EngineState {
    fn new() -> Self {
        Self {
            ready_queue: VecDeque::new(),
            timers: Vec::new(),
            next_timer_id: 0,
            num_timer_cancel: 0,
        }
    }

    /// Index of the due timer to expire next: earliest deadline, then oldest.
    fn next_due(&self, now: Instant) -> Option<usize> {
        self.timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.deadline <= now)
            .min_by_key(|(_, timer)| (timer.deadline, timer.id))
            .map(|(index, _)| index)
    }

    /// Moves every timer due at `now` into the ready queue.
    fn expire_due_timers(&mut self, now: Instant, executor: &str) -> usize {
        let mut fired = 0;
        while let Some(index) = self.next_due(now) {
            let timer = self.timers.remove(index);
            debug!(executor, timer = %timer.id, deadline = %timer.deadline, %now, "timer fired");
            self.ready_queue.push_back(timer.action);
            fired += 1;
        }
        fired
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|timer| timer.deadline).min()
    }
}

impl ExecutorInner {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("test")
    }

    fn cancel(&self, id: TimerId) {
        let removed = {
            let mut state = self.state.lock();
            let position = state.timers.iter().position(|timer| timer.id == id);
            position.map(|index| {
                state.num_timer_cancel += 1;
                state.timers.remove(index)
            })
        };
        // The action is dropped outside the lock; its captures may call back in.
        if let Some(timer) = removed {
            debug!(executor = self.label(), timer = %timer.id, "timer cancelled");
        }
    }
}

/// Engine-side view of a timer, shared with every clone of its handle.
struct VirtualTimer {
    id: TimerId,
    deadline: Instant,
    executor: Weak<ExecutorInner>,
}

impl TimerControl for VirtualTimer {
    fn id(&self) -> TimerId {
        self.id
    }

    fn expires_at(&self) -> Instant {
        self.deadline
    }

    fn cancel(&self) {
        if let Some(executor) = self.executor.upgrade() {
            executor.cancel(self.id);
        }
    }
}

impl TestExecutor {
    /// Creates a new executor with the virtual clock at zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use exekit::clock::Instant;
    /// use exekit::executor::TestExecutor;
    /// use exekit::runtime::TimeSource;
    ///
    /// let executor = TestExecutor::new();
    /// assert_eq!(executor.now(), Instant::ZERO);
    /// assert!(executor.is_idle());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::new())
    }

    /// Creates a new executor with the virtual clock at `start`.
    #[must_use]
    pub fn with_start_time(start: Duration) -> Self {
        Self::with_config(ExecutorConfig::new().start_time(start))
    }

    /// Creates a new executor from a configuration.
    #[must_use]
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                clock: VirtualClock::with_start_time(config.start_time),
                state: Mutex::new(EngineState::new()),
                name: config.name,
            }),
        }
    }

    /// Returns the configured name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Returns a read-only handle to this executor's virtual clock.
    #[must_use]
    pub fn clock(&self) -> VirtualClock {
        self.inner.clock.clone()
    }

    /// Runs a single ready action.
    ///
    /// Due timers are expired into the ready queue first. Returns `true` if an
    /// action was run, `false` if nothing was ready. Never blocks.
    pub fn run_one(&self) -> bool {
        let action = {
            let mut state = self.inner.state.lock();
            state.expire_due_timers(self.inner.clock.now(), self.inner.label());
            state.ready_queue.pop_front()
        };

        match action {
            Some(action) => {
                trace!(executor = self.inner.label(), "running action");
                action();
                true
            }
            None => false,
        }
    }

    /// Calls [`run_one`](Self::run_one) until it returns `false` or `maximum`
    /// actions have run.
    ///
    /// Returns the number of actions run. Pass `usize::MAX` for no limit.
    ///
    /// # Example
    ///
    /// ```rust
    /// use exekit::executor::TestExecutor;
    /// use exekit::runtime::ExecutorExt;
    ///
    /// let executor = TestExecutor::new();
    /// for _ in 0..3 {
    ///     executor.post_fn(|| {});
    /// }
    ///
    /// assert_eq!(executor.run_many(2), 2);
    /// assert_eq!(executor.run_many(usize::MAX), 1);
    /// ```
    pub fn run_many(&self, maximum: usize) -> usize {
        let mut count = 0;
        while count < maximum && self.run_one() {
            count += 1;
        }
        count
    }

    /// Advances the virtual clock by `duration` and expires due timers.
    ///
    /// Returns the number of timers that fired. Their actions are queued, not run.
    pub fn advance_time(&self, duration: Duration) -> usize {
        let mut state = self.inner.state.lock();
        let now = self.inner.clock.advance(duration);
        let fired = state.expire_due_timers(now, self.inner.label());
        debug!(executor = self.inner.label(), %now, fired, "advanced time");
        fired
    }

    /// Advances the virtual clock by `duration` without expiring timers.
    ///
    /// Timers that became due fire on the next [`run_one`](Self::run_one) or
    /// [`advance_time`](Self::advance_time).
    pub fn add_time(&self, duration: Duration) {
        let _state = self.inner.state.lock();
        let now = self.inner.clock.advance(duration);
        debug!(executor = self.inner.label(), %now, "added time");
    }

    /// Moves the virtual clock to the earliest pending timer's deadline.
    ///
    /// Returns `false` without touching the clock if there are no pending
    /// timers or the earliest one is already due. The timer itself is not
    /// fired; a subsequent `run_one` or `advance_time(Duration::ZERO)` does that.
    ///
    /// # Example
    ///
    /// ```rust
    /// use exekit::executor::TestExecutor;
    /// use exekit::runtime::{ExecutorExt, TimeSource};
    /// use std::time::Duration;
    ///
    /// let executor = TestExecutor::new();
    /// assert!(!executor.advance_to_next_timer());
    ///
    /// executor.schedule_fn(Duration::from_secs(30), || {});
    /// assert!(executor.advance_to_next_timer());
    /// assert_eq!(executor.now().as_duration(), Duration::from_secs(30));
    ///
    /// // Due but not yet fired
    /// assert!(!executor.advance_to_next_timer());
    /// assert_eq!(executor.num_pending_timers(), 1);
    /// ```
    pub fn advance_to_next_timer(&self) -> bool {
        let state = self.inner.state.lock();
        let Some(next) = state.next_deadline() else {
            return false;
        };
        let moved = self.inner.clock.advance_to(next);
        if moved {
            debug!(executor = self.inner.label(), now = %next, "advanced to next timer");
        }
        moved
    }

    /// Returns the number of actions in the ready queue.
    #[must_use]
    pub fn num_active(&self) -> usize {
        self.inner.state.lock().ready_queue.len()
    }

    /// Returns the number of timers that have neither fired nor been cancelled.
    #[must_use]
    pub fn num_pending_timers(&self) -> usize {
        self.inner.state.lock().timers.len()
    }

    /// Returns how many pending timers have been cancelled.
    ///
    /// Cancelling a timer that already fired or was already cancelled does not count.
    #[must_use]
    pub fn num_timer_cancel(&self) -> usize {
        self.inner.state.lock().num_timer_cancel
    }

    /// Returns true if there is no ready work and no pending timer.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.ready_queue.is_empty() && state.timers.is_empty()
    }

    /// Returns the earliest pending deadline.
    #[must_use]
    pub fn next_timer_expiration_abs(&self) -> Option<Instant> {
        self.inner.state.lock().next_deadline()
    }

    /// Returns the time remaining until the earliest pending deadline.
    ///
    /// Returns `Duration::ZERO` when that timer is already due.
    #[must_use]
    pub fn next_timer_expiration_rel(&self) -> Option<Duration> {
        let now = self.inner.clock.now();
        self.next_timer_expiration_abs()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Spawns a future that is polled by actions posted to this executor.
    ///
    /// # Example
    ///
    /// ```rust
    /// use exekit::executor::TestExecutor;
    /// use exekit::runtime::ExecutorExt;
    /// use std::time::Duration;
    ///
    /// let executor = TestExecutor::new();
    /// let sleeper = executor.clone();
    /// let handle = executor.spawn(async move {
    ///     sleeper.delay(Duration::from_secs(5)).await;
    ///     42
    /// });
    ///
    /// executor.run_many(usize::MAX);
    /// assert!(!handle.is_complete());
    ///
    /// executor.advance_time(Duration::from_secs(5));
    /// executor.run_many(usize::MAX);
    /// assert_eq!(handle.take(), Some(42));
    /// ```
    pub fn spawn<F>(&self, future: F) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        task::spawn(self, future)
    }

    /// Drives `future` to completion, skipping virtual time forward whenever
    /// no action is ready.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stalled`] if the future is still incomplete while the
    /// ready queue is empty and no timer is pending.
    ///
    /// # Example
    ///
    /// ```rust
    /// use exekit::executor::TestExecutor;
    /// use exekit::runtime::{ExecutorExt, TimeSource};
    /// use std::time::Duration;
    ///
    /// let executor = TestExecutor::new();
    /// let inner = executor.clone();
    /// let value = executor
    ///     .block_on(async move {
    ///         inner.delay(Duration::from_secs(60)).await;
    ///         "done"
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(value, "done");
    /// assert_eq!(executor.now().as_duration(), Duration::from_secs(60));
    /// ```
    pub fn block_on<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = self.spawn(future);
        loop {
            self.run_many(usize::MAX);
            if let Some(output) = handle.take() {
                return Ok(output);
            }
            // The drain above expired every due timer, so any pending timer
            // lies strictly in the future.
            if !self.advance_to_next_timer() {
                return Err(Error::Stalled);
            }
        }
    }
}

impl Default for TestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for TestExecutor {
    fn now(&self) -> Instant {
        self.inner.clock.now()
    }
}

impl Executor for TestExecutor {
    fn post(&self, action: Action) {
        self.inner.state.lock().ready_queue.push_back(action);
        trace!(executor = self.inner.label(), "action posted");
    }

    fn schedule_at(&self, deadline: Instant, action: Action) -> TimerHandle {
        let id = {
            let mut state = self.inner.state.lock();
            let id = TimerId::new(state.next_timer_id);
            state.next_timer_id += 1;
            state.timers.push(PendingTimer {
                id,
                deadline,
                action,
            });
            id
        };
        trace!(executor = self.inner.label(), timer = %id, %deadline, "timer scheduled");

        TimerHandle::new(Arc::new(VirtualTimer {
            id,
            deadline,
            executor: Arc::downgrade(&self.inner),
        }))
    }
}

impl fmt::Debug for TestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TestExecutor")
            .field("name", &self.inner.name)
            .field("now", &self.inner.clock.now())
            .field("active", &state.ready_queue.len())
            .field("pending_timers", &state.timers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ExecutorExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn push(log: &Arc<Mutex<Vec<&'static str>>>, entry: &'static str) -> impl FnOnce() + Send + 'static {
        let log = Arc::clone(log);
        move || log.lock().push(entry)
    }

    #[test]
    fn test_new_executor_is_idle() {
        let executor = TestExecutor::new();
        assert!(executor.is_idle());
        assert_eq!(executor.num_active(), 0);
        assert_eq!(executor.num_pending_timers(), 0);
        assert_eq!(executor.num_timer_cancel(), 0);
        assert_eq!(executor.now(), Instant::ZERO);
    }

    #[test]
    fn test_run_one_returns_false_when_empty() {
        let executor = TestExecutor::new();
        assert!(!executor.run_one());
        assert_eq!(executor.run_many(usize::MAX), 0);
    }

    #[test]
    fn test_posted_actions_run_in_order() {
        let executor = TestExecutor::new();
        let log = recorder();
        executor.post_fn(push(&log, "a"));
        executor.post_fn(push(&log, "b"));
        executor.post_fn(push(&log, "c"));
        assert_eq!(executor.num_active(), 3);

        assert_eq!(executor.run_many(usize::MAX), 3);
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
        assert_eq!(executor.num_active(), 0);
    }

    #[test]
    fn test_run_many_respects_maximum() {
        let executor = TestExecutor::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let count = Arc::clone(&count);
            executor.post_fn(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(executor.run_many(2), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(executor.run_many(0), 0);
        assert_eq!(executor.run_many(10), 3);
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_post_before_timer_scenario() {
        let executor = TestExecutor::new();
        let log = recorder();
        executor.schedule_fn(Duration::from_secs(10), push(&log, "A"));
        executor.post_fn(push(&log, "B"));

        assert!(executor.run_one());
        assert_eq!(*log.lock(), vec!["B"]);

        assert_eq!(executor.advance_time(Duration::from_secs(10)), 1);
        assert!(executor.run_one());
        assert!(!executor.run_one());
        assert_eq!(*log.lock(), vec!["B", "A"]);
    }

    #[test]
    fn test_timer_not_run_before_deadline() {
        let executor = TestExecutor::new();
        let log = recorder();
        executor.schedule_fn(Duration::from_secs(5), push(&log, "timer"));

        assert_eq!(executor.advance_time(Duration::from_secs(4)), 0);
        assert_eq!(executor.run_many(usize::MAX), 0);
        assert!(log.lock().is_empty());

        assert_eq!(executor.advance_time(Duration::from_secs(1)), 1);
        assert_eq!(executor.run_many(usize::MAX), 1);
        assert_eq!(executor.run_many(usize::MAX), 0);
        assert_eq!(*log.lock(), vec!["timer"]);
    }

    #[test]
    fn test_fired_timer_queues_behind_earlier_posts() {
        let executor = TestExecutor::new();
        let log = recorder();
        executor.post_fn(push(&log, "first"));
        executor.schedule_fn(Duration::from_secs(1), push(&log, "timer"));
        executor.advance_time(Duration::from_secs(1));
        executor.post_fn(push(&log, "after"));

        executor.run_many(usize::MAX);
        assert_eq!(*log.lock(), vec!["first", "timer", "after"]);
    }

    #[test]
    fn test_cancel_before_due() {
        let executor = TestExecutor::new();
        let log = recorder();
        let timer = executor.schedule_fn(Duration::from_secs(5), push(&log, "timer"));

        timer.cancel();
        assert_eq!(executor.num_timer_cancel(), 1);
        assert_eq!(executor.num_pending_timers(), 0);

        assert_eq!(executor.advance_time(Duration::from_secs(5)), 0);
        assert_eq!(executor.run_many(usize::MAX), 0);
        assert!(log.lock().is_empty());

        timer.cancel();
        assert_eq!(executor.num_timer_cancel(), 1);
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let executor = TestExecutor::new();
        let log = recorder();
        let timer = executor.schedule_fn(Duration::from_secs(1), push(&log, "timer"));

        executor.advance_time(Duration::from_secs(1));
        // Fired into the ready queue; cancelling can no longer stop it.
        timer.cancel();
        assert_eq!(executor.num_timer_cancel(), 0);
        assert_eq!(executor.run_many(usize::MAX), 1);
        assert_eq!(*log.lock(), vec!["timer"]);
    }

    #[test]
    fn test_expires_at_survives_cancel() {
        let executor = TestExecutor::with_start_time(Duration::from_secs(2));
        let timer = executor.schedule_fn(Duration::from_secs(3), || {});
        timer.cancel();
        assert_eq!(timer.expires_at().as_duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_dropped_handle_leaves_timer_pending() {
        let executor = TestExecutor::new();
        let log = recorder();
        drop(executor.schedule_fn(Duration::from_secs(1), push(&log, "timer")));

        assert_eq!(executor.num_pending_timers(), 1);
        executor.advance_time(Duration::from_secs(1));
        executor.run_many(usize::MAX);
        assert_eq!(*log.lock(), vec!["timer"]);
        assert_eq!(executor.num_timer_cancel(), 0);
    }

    #[test]
    fn test_cancel_after_executor_dropped_is_noop() {
        let executor = TestExecutor::new();
        let timer = executor.schedule_fn(Duration::from_secs(1), || {});
        drop(executor);
        timer.cancel();
        assert_eq!(timer.expires_at().as_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_schedule_at_past_deadline_fires_on_next_run() {
        let executor = TestExecutor::with_start_time(Duration::from_secs(10));
        let log = recorder();
        executor.schedule_at_fn(Instant::from_duration(Duration::from_secs(3)), push(&log, "late"));

        assert!(executor.run_one());
        assert_eq!(*log.lock(), vec!["late"]);
    }

    #[test]
    fn test_co_expiring_timers_fire_by_deadline() {
        let executor = TestExecutor::new();
        let log = recorder();
        executor.schedule_fn(Duration::from_secs(9), push(&log, "nine"));
        executor.schedule_fn(Duration::from_secs(3), push(&log, "three"));
        executor.schedule_fn(Duration::from_secs(3), push(&log, "three-again"));

        assert_eq!(executor.advance_time(Duration::from_secs(10)), 3);
        executor.run_many(usize::MAX);
        assert_eq!(*log.lock(), vec!["three", "three-again", "nine"]);
    }

    #[test]
    fn test_add_time_defers_expiry() {
        let executor = TestExecutor::new();
        let log = recorder();
        executor.schedule_fn(Duration::from_secs(2), push(&log, "timer"));

        executor.add_time(Duration::from_secs(5));
        assert_eq!(executor.now().as_duration(), Duration::from_secs(5));
        assert_eq!(executor.num_pending_timers(), 1);
        assert_eq!(executor.num_active(), 0);

        assert!(executor.run_one());
        assert_eq!(*log.lock(), vec!["timer"]);
    }

    #[test]
    fn test_advance_to_next_timer() {
        let executor = TestExecutor::new();
        assert!(!executor.advance_to_next_timer());
        assert_eq!(executor.now(), Instant::ZERO);

        executor.schedule_fn(Duration::from_secs(20), || {});
        executor.schedule_fn(Duration::from_secs(7), || {});

        assert!(executor.advance_to_next_timer());
        assert_eq!(executor.now().as_duration(), Duration::from_secs(7));
        assert_eq!(executor.num_pending_timers(), 2);

        // Already due: nothing to advance to
        assert!(!executor.advance_to_next_timer());
        assert_eq!(executor.now().as_duration(), Duration::from_secs(7));

        assert_eq!(executor.advance_time(Duration::ZERO), 1);
        assert!(executor.advance_to_next_timer());
        assert_eq!(executor.now().as_duration(), Duration::from_secs(20));
    }

    #[test]
    fn test_split_advance_fires_same_timers_at_every_boundary() {
        let deadlines = [0, 0, 1, 4, 4, 9, 12];
        let fire = |split: bool, advance: u64| {
            let executor = TestExecutor::new();
            let fired = Arc::new(Mutex::new(Vec::new()));
            for (index, secs) in deadlines.into_iter().enumerate() {
                let fired = Arc::clone(&fired);
                executor.schedule_fn(Duration::from_secs(secs), move || fired.lock().push(index));
            }

            let mut count = executor.advance_time(Duration::from_secs(advance));
            if split {
                count += executor.advance_time(Duration::ZERO);
            }
            executor.run_many(usize::MAX);

            let mut fired = fired.lock().clone();
            fired.sort_unstable();
            (fired, count)
        };

        for advance in 0..=13 {
            let expected: Vec<usize> = deadlines
                .into_iter()
                .enumerate()
                .filter(|&(_, deadline)| deadline <= advance)
                .map(|(index, _)| index)
                .collect();
            let count = expected.len();

            assert_eq!(fire(false, advance), (expected.clone(), count), "advance {advance}");
            assert_eq!(fire(true, advance), (expected, count), "split advance {advance}");
        }
    }

    #[test]
    fn test_next_timer_expiration() {
        let executor = TestExecutor::new();
        assert_eq!(executor.next_timer_expiration_abs(), None);
        assert_eq!(executor.next_timer_expiration_rel(), None);

        executor.schedule_fn(Duration::from_secs(8), || {});
        executor.schedule_fn(Duration::from_secs(5), || {});
        executor.add_time(Duration::from_secs(2));

        assert_eq!(
            executor.next_timer_expiration_abs(),
            Some(Instant::from_duration(Duration::from_secs(5)))
        );
        assert_eq!(executor.next_timer_expiration_rel(), Some(Duration::from_secs(3)));

        executor.add_time(Duration::from_secs(4));
        assert_eq!(executor.next_timer_expiration_rel(), Some(Duration::ZERO));
    }

    #[test]
    fn test_reentrant_post_runs_in_later_step() {
        let executor = TestExecutor::new();
        let log = recorder();

        let inner = executor.clone();
        let nested = push(&log, "nested");
        let outer_log = Arc::clone(&log);
        executor.post_fn(move || {
            inner.post_fn(nested);
            outer_log.lock().push("outer");
        });
        executor.post_fn(push(&log, "sibling"));

        assert!(executor.run_one());
        assert_eq!(*log.lock(), vec!["outer"]);
        assert_eq!(executor.num_active(), 2);

        executor.run_many(usize::MAX);
        assert_eq!(*log.lock(), vec!["outer", "sibling", "nested"]);
    }

    #[test]
    fn test_reentrant_cancel_from_action() {
        let executor = TestExecutor::new();
        let log = recorder();
        let victim = executor.schedule_fn(Duration::from_secs(5), push(&log, "victim"));

        executor.schedule_fn(Duration::from_secs(1), move || victim.cancel());

        executor.advance_time(Duration::from_secs(1));
        executor.run_many(usize::MAX);
        assert_eq!(executor.num_timer_cancel(), 1);

        executor.advance_time(Duration::from_secs(10));
        assert_eq!(executor.run_many(usize::MAX), 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_reentrant_schedule_from_timer() {
        let executor = TestExecutor::new();
        let log = recorder();
        let inner = executor.clone();
        let second = push(&log, "second");
        executor.schedule_fn(Duration::from_secs(1), move || {
            inner.schedule_fn(Duration::from_secs(1), second);
        });

        executor.advance_time(Duration::from_secs(1));
        executor.run_many(usize::MAX);
        assert_eq!(executor.num_pending_timers(), 1);
        assert_eq!(
            executor.next_timer_expiration_abs(),
            Some(Instant::from_duration(Duration::from_secs(2)))
        );

        executor.advance_time(Duration::from_secs(1));
        executor.run_many(usize::MAX);
        assert_eq!(*log.lock(), vec!["second"]);
    }

    #[test]
    fn test_independent_executors_do_not_interfere() {
        let first = TestExecutor::new();
        let second = TestExecutor::new();
        first.schedule_fn(Duration::from_secs(1), || {});

        first.advance_time(Duration::from_secs(10));
        assert_eq!(second.now(), Instant::ZERO);
        assert_eq!(second.num_pending_timers(), 0);
        assert_eq!(first.num_active(), 1);
    }

    #[test]
    fn test_clone_shares_state() {
        let executor1 = TestExecutor::new();
        let executor2 = executor1.clone();

        executor1.post_fn(|| {});
        assert_eq!(executor2.num_active(), 1);

        executor2.advance_time(Duration::from_secs(3));
        assert_eq!(executor1.now().as_duration(), Duration::from_secs(3));
        assert!(executor2.run_one());
        assert!(executor1.is_idle());
    }

    #[test]
    fn test_block_on_stalls_without_timers() {
        let executor = TestExecutor::new();
        let result = executor.block_on(std::future::pending::<()>());
        assert_eq!(result, Err(Error::Stalled));
    }

    #[test]
    fn test_debug() {
        let executor = TestExecutor::with_config(ExecutorConfig::new().name("dbg"));
        executor.post_fn(|| {});
        let debug = format!("{executor:?}");
        assert!(debug.contains("TestExecutor"));
        assert!(debug.contains("dbg"));
        assert!(debug.contains("active: 1"));
    }

    #[test]
    fn test_default() {
        let executor = TestExecutor::default();
        assert!(executor.is_idle());
        assert_eq!(executor.name(), None);
    }
}
