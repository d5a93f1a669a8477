use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Handle;

use super::{Scheduler, Task, TimerToken};

/// Runs each timer as its own task on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// Bind to the runtime the caller is running on.
    pub fn current() -> Result<Self> {
        let runtime = Handle::try_current().context("no tokio runtime is running")?;
        Ok(Self { runtime })
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_after(&self, delay: Duration, task: Task) -> TimerToken {
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        let abort = handle.abort_handle();
        TimerToken::new(move || abort.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn current_fails_outside_runtime() {
        assert!(TokioScheduler::current().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn task_fires_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let _token = scheduler.schedule_after(
            Duration::from_millis(100),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_fires() {
        let scheduler = TokioScheduler::current().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let token = scheduler.schedule_after(
            Duration::from_millis(100),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        token.cancel();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
