use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Scheduler, Task, TimerToken, lock};

/// Upper bound on tasks run by one [`ManualScheduler::advance`] or
/// [`ManualScheduler::run_until_idle`] call.
const IDLE_LIMIT: usize = 100_000;

/// Queue key: due time, then registration order.
type Key = (Duration, u64);

#[derive(Default)]
struct Inner {
    now: Duration,
    next_seq: u64,
    scheduled: usize,
    queue: BTreeMap<Key, Task>,
}

/// A virtual clock. Nothing runs until the clock is advanced.
///
/// Tasks due at the same instant run in the order they were scheduled.
/// Tasks run outside the internal lock, so they may schedule more work.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<Inner>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        lock(&self.inner).now
    }

    /// Tasks waiting to run.
    pub fn pending(&self) -> usize {
        lock(&self.inner).queue.len()
    }

    /// Total number of tasks ever registered, cancelled ones included.
    pub fn scheduled(&self) -> usize {
        lock(&self.inner).scheduled
    }

    /// Due time of the next pending task.
    pub fn next_due(&self) -> Option<Duration> {
        lock(&self.inner).queue.keys().next().map(|(due, _)| *due)
    }

    /// Move the clock forward, running every task that comes due on the way.
    /// Returns the number of tasks run.
    ///
    /// Tasks that keep rescheduling themselves at zero delay would never let
    /// the clock reach `by`, so this stops after a fixed number of tasks.
    pub fn advance(&self, by: Duration) -> usize {
        let target = lock(&self.inner).now + by;
        let mut ran = 0;
        while ran < IDLE_LIMIT {
            let Some(task) = self.pop_due(Some(target)) else {
                break;
            };
            task();
            ran += 1;
        }
        if ran == IDLE_LIMIT {
            tracing::warn!(ran, "advance stopped at the task limit");
        }
        let mut inner = lock(&self.inner);
        if inner.now < target {
            inner.now = target;
        }
        ran
    }

    /// Run tasks in due order until the queue is empty, jumping the clock
    /// forward as needed. Stops at the same task limit as
    /// [`advance`](Self::advance). Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while ran < IDLE_LIMIT {
            match self.pop_due(None) {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    fn pop_due(&self, limit: Option<Duration>) -> Option<Task> {
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        let entry = inner.queue.first_entry()?;
        let due = entry.key().0;
        if limit.is_some_and(|limit| due > limit) {
            return None;
        }
        let task = entry.remove();
        if inner.now < due {
            inner.now = due;
        }
        Some(task)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, task: Task) -> TimerToken {
        let mut inner = lock(&self.inner);
        let key = (inner.now + delay, inner.next_seq);
        inner.next_seq += 1;
        inner.scheduled += 1;
        inner.queue.insert(key, task);
        tracing::trace!(due = ?key.0, "timer registered");

        let queue = Arc::downgrade(&self.inner);
        TimerToken::new(move || {
            if let Some(inner) = queue.upgrade() {
                lock(&inner).queue.remove(&key);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |name: &'static str| -> Task {
            let sink = Arc::clone(&sink);
            Box::new(move || sink.lock().unwrap().push(name))
        };
        (log, make)
    }

    #[test]
    fn nothing_runs_before_due() {
        let clock = ManualScheduler::new();
        let (log, task) = recorder();
        let _ = clock.schedule_after(Duration::from_millis(10), task("a"));

        assert_eq!(clock.advance(Duration::from_millis(9)), 0);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(clock.advance(Duration::from_millis(1)), 1);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
        assert_eq!(clock.now(), Duration::from_millis(10));
    }

    #[test]
    fn runs_in_due_then_registration_order() {
        let clock = ManualScheduler::new();
        let (log, task) = recorder();
        let _ = clock.schedule_after(Duration::from_millis(20), task("late"));
        let _ = clock.schedule_after(Duration::from_millis(5), task("first"));
        let _ = clock.schedule_after(Duration::from_millis(5), task("second"));

        clock.advance(Duration::from_millis(100));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "late"]);
    }

    #[test]
    fn tasks_can_schedule_more_tasks() {
        let clock = ManualScheduler::new();
        let (log, task) = recorder();
        let inner_clock = clock.clone();
        let follow_up = task("follow-up");
        let _ = clock.schedule_after(
            Duration::from_millis(10),
            Box::new(move || {
                let _ = inner_clock.schedule_after(Duration::from_millis(10), follow_up);
            }),
        );

        assert_eq!(clock.advance(Duration::from_millis(15)), 1);
        assert_eq!(clock.pending(), 1);
        assert_eq!(clock.next_due(), Some(Duration::from_millis(20)));
        assert_eq!(clock.advance(Duration::from_millis(5)), 1);
        assert_eq!(*log.lock().unwrap(), vec!["follow-up"]);
    }

    #[test]
    fn cancelled_task_is_removed() {
        let clock = ManualScheduler::new();
        let (log, task) = recorder();
        let token = clock.schedule_after(Duration::from_millis(10), task("a"));
        token.cancel();

        assert_eq!(clock.pending(), 0);
        assert_eq!(clock.scheduled(), 1);
        clock.advance(Duration::from_millis(50));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_delay_still_waits_for_advance() {
        let clock = ManualScheduler::new();
        let (log, task) = recorder();
        let _ = clock.schedule_after(Duration::ZERO, task("now"));

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(clock.advance(Duration::ZERO), 1);
        assert_eq!(*log.lock().unwrap(), vec!["now"]);
    }

    fn respawn(clock: ManualScheduler, hits: Arc<Mutex<usize>>) {
        let next = clock.clone();
        let _ = clock.schedule_after(
            Duration::ZERO,
            Box::new(move || {
                *hits.lock().unwrap() += 1;
                respawn(next, hits);
            }),
        );
    }

    #[test]
    fn advance_gives_up_on_endless_zero_delay_work() {
        let clock = ManualScheduler::new();
        let hits = Arc::new(Mutex::new(0));
        respawn(clock.clone(), Arc::clone(&hits));

        assert_eq!(clock.advance(Duration::ZERO), IDLE_LIMIT);
        assert_eq!(*hits.lock().unwrap(), IDLE_LIMIT);
        assert_eq!(clock.pending(), 1);
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn run_until_idle_jumps_the_clock() {
        let clock = ManualScheduler::new();
        let (log, task) = recorder();
        let _ = clock.schedule_after(Duration::from_secs(3), task("a"));

        assert_eq!(clock.run_until_idle(), 1);
        assert_eq!(clock.now(), Duration::from_secs(3));
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }
}
