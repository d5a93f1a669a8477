//! Delayed-callback registration.
//!
//! Everything timed in this crate goes through a [`Scheduler`]: the
//! sequencer and the panel controller never sleep or spawn on their own.
//! [`TokioScheduler`](runtime::TokioScheduler) drives real time,
//! [`ManualScheduler`](manual::ManualScheduler) drives a virtual clock.

pub mod manual;
pub mod runtime;

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Registers callbacks to run no earlier than a given delay.
pub trait Scheduler: Send + Sync {
    fn schedule_after(&self, delay: Duration, task: Task) -> TimerToken;
}

/// Cancels a scheduled task that has not run yet.
///
/// Dropping a token detaches it; the task still runs.
pub struct TimerToken {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerToken {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A token with nothing to cancel.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerToken")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
