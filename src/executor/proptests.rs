use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use proptest::prelude::*;

use super::TestExecutor;
use crate::runtime::{ExecutorExt, TimeSource};

const MAX_OPS: usize = 64;
const MAX_TIMERS: usize = 24;
const MAX_DEADLINE_SECS: u64 = 40;

#[derive(Debug, Clone)]
enum Op {
    Post,
    RunOne,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![3 => Just(Op::Post), 1 => Just(Op::RunOne)]
}

#[derive(Debug, Clone)]
struct TimerSpec {
    deadline_secs: u64,
    cancelled: bool,
}

fn timer_strategy() -> impl Strategy<Value = TimerSpec> {
    (0..=MAX_DEADLINE_SECS, prop::bool::weighted(0.25)).prop_map(|(deadline_secs, cancelled)| {
        TimerSpec {
            deadline_secs,
            cancelled,
        }
    })
}

/// Schedules every timer relative to the executor's current time and returns
/// the shared log their actions append their index to.
fn schedule_all(executor: &TestExecutor, timers: &[TimerSpec]) -> Arc<Mutex<Vec<usize>>> {
    let fired = Arc::new(Mutex::new(Vec::new()));
    for (index, spec) in timers.iter().enumerate() {
        let log = Arc::clone(&fired);
        let timer = executor.schedule_fn(Duration::from_secs(spec.deadline_secs), move || {
            log.lock().push(index);
        });
        if spec.cancelled {
            timer.cancel();
        }
    }
    fired
}

fn fired_set(fired: &Mutex<Vec<usize>>) -> BTreeSet<usize> {
    fired.lock().iter().copied().collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_posted_actions_run_once_in_order(ops in prop::collection::vec(op_strategy(), 0..MAX_OPS)) {
        let executor = TestExecutor::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut model = VecDeque::new();
        let mut posted = 0usize;

        for op in ops {
            match op {
                Op::Post => {
                    let log = Arc::clone(&log);
                    let id = posted;
                    executor.post_fn(move || log.lock().push(id));
                    model.push_back(id);
                    posted += 1;
                }
                Op::RunOne => {
                    prop_assert_eq!(executor.run_one(), model.pop_front().is_some());
                }
            }
            prop_assert_eq!(executor.num_active(), model.len());
        }

        prop_assert_eq!(executor.run_many(usize::MAX), model.len());
        prop_assert_eq!(&*log.lock(), &(0..posted).collect::<Vec<_>>());
        prop_assert!(executor.is_idle());
    }

    #[test]
    fn prop_split_advance_expires_same_timers(
        start_secs in 0u64..10,
        timers in prop::collection::vec(timer_strategy(), 0..MAX_TIMERS),
        advance_secs in 0..=MAX_DEADLINE_SECS + 2,
    ) {
        let run = |split: bool| {
            let executor = TestExecutor::with_start_time(Duration::from_secs(start_secs));
            let fired = schedule_all(&executor, &timers);
            let mut count = executor.advance_time(Duration::from_secs(advance_secs));
            if split {
                count += executor.advance_time(Duration::ZERO);
            }
            executor.run_many(usize::MAX);
            (fired_set(&fired), count, executor.num_pending_timers())
        };

        let expected: BTreeSet<usize> = timers
            .iter()
            .enumerate()
            .filter(|(_, spec)| !spec.cancelled && spec.deadline_secs <= advance_secs)
            .map(|(index, _)| index)
            .collect();

        let single = run(false);
        prop_assert_eq!(&single.0, &expected);
        prop_assert_eq!(single.1, expected.len());
        prop_assert_eq!(run(true), single);
    }

    #[test]
    fn prop_timers_fire_exactly_when_due(
        timers in prop::collection::vec(timer_strategy(), 0..MAX_TIMERS),
        steps in prop::collection::vec(0u64..8, 1..12),
    ) {
        let executor = TestExecutor::new();
        let fired = schedule_all(&executor, &timers);
        let cancelled = timers.iter().filter(|spec| spec.cancelled).count();
        prop_assert_eq!(executor.num_timer_cancel(), cancelled);

        for step in steps {
            executor.advance_time(Duration::from_secs(step));
            executor.run_many(usize::MAX);

            let now = executor.now().as_duration();
            let due: BTreeSet<usize> = timers
                .iter()
                .enumerate()
                .filter(|(_, spec)| {
                    !spec.cancelled && Duration::from_secs(spec.deadline_secs) <= now
                })
                .map(|(index, _)| index)
                .collect();

            let log = fired.lock().clone();
            prop_assert_eq!(log.len(), due.len(), "a timer ran more than once");
            prop_assert_eq!(log.into_iter().collect::<BTreeSet<_>>(), due);
        }

        prop_assert_eq!(executor.num_timer_cancel(), cancelled);
    }
}
