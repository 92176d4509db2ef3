use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Runs an async action periodically on its own task.
///
/// Typically started from `after_start` and stopped from `before_stop`. The first run
/// happens one `period` after [`start`](Self::start). Dropping the timer stops it.
#[derive(Debug, Default)]
pub struct TimerTask {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TimerTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts ticking, replacing a previous schedule if any.
    pub fn start<F, Fut>(&self, period: Duration, mut action: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(MIN_PERIOD);
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                action().await;
            }
        });

        if let Some(previous) = self.slot().replace(task) {
            previous.abort();
        }
        debug!(?period, "timer started");
    }

    /// Cancels the schedule. Safe to call repeatedly or before `start`.
    pub fn stop(&self) {
        if let Some(task) = self.slot().take() {
            task.abort();
            debug!("timer stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot().as_ref().is_some_and(|task| !task.is_finished())
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        self.stop();
    }
}
