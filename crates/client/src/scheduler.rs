//! Periodic task scheduling.
//!
//! [`TokioScheduler`] drives real timers; [`ManualScheduler`] is a virtual
//! clock that only ticks when advanced, for deterministic tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};

/// What the task wants after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop,
}

pub type TickFuture = Pin<Box<dyn Future<Output = TickOutcome> + Send + 'static>>;
pub type TickFn = Arc<dyn Fn() -> TickFuture + Send + Sync>;

/// Starts periodic tasks. The first tick happens one full period after
/// scheduling.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, name: &'static str, period: Duration, tick: TickFn) -> Box<dyn ScheduledTask>;
}

/// Handle to a scheduled task. Dropping the handle stops the task.
pub trait ScheduledTask: Send + Sync {
    /// Stop the task; no tick starts after this returns. A tick already in
    /// flight runs to completion.
    fn stop(&self);
    fn is_running(&self) -> bool;
}

/// Scheduler backed by `tokio::time::interval`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

struct TokioTask {
    shutdown: Arc<Notify>,
    stopped: Arc<AtomicBool>,
}

impl ScheduledTask for TokioTask {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so a stop issued while the task is busy
        // inside a tick is still observed on the next loop iteration.
        self.shutdown.notify_one();
    }

    fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for TokioTask {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, name: &'static str, period: Duration, tick: TickFn) -> Box<dyn ScheduledTask> {
        let shutdown = Arc::new(Notify::new());
        let stopped = Arc::new(AtomicBool::new(false));

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(task = name, "no tokio runtime available; periodic task not started");
            stopped.store(true, Ordering::SeqCst);
            return Box::new(TokioTask { shutdown, stopped });
        };

        let task_shutdown = shutdown.clone();
        let task_stopped = stopped.clone();

        runtime.spawn(async move {
            tracing::debug!(task = name, ?period, "periodic task started");

            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = task_shutdown.notified() => {
                        break;
                    }
                    _ = interval.tick() => {
                        if task_stopped.load(Ordering::SeqCst) {
                            break;
                        }
                        if tick().await == TickOutcome::Stop {
                            break;
                        }
                    }
                }
            }

            task_stopped.store(true, Ordering::SeqCst);
            tracing::debug!(task = name, "periodic task stopped");
        });

        Box::new(TokioTask { shutdown, stopped })
    }
}

/// Virtual-clock scheduler: ticks fire only from [`ManualScheduler::advance`].
#[derive(Clone, Default)]
pub struct ManualScheduler {
    entries: Arc<Mutex<Vec<ManualEntry>>>,
}

struct ManualEntry {
    name: &'static str,
    period: Duration,
    elapsed: Duration,
    tick: TickFn,
    stopped: Arc<AtomicBool>,
}

struct ManualTask {
    stopped: Arc<AtomicBool>,
}

impl ScheduledTask for ManualTask {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for ManualTask {
    fn drop(&mut self) {
        self.stop();
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks that have not been stopped.
    pub fn active_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| !e.stopped.load(Ordering::SeqCst))
            .count()
    }

    /// Move the virtual clock forward, running every tick that became due.
    /// Returns the number of ticks that ran.
    pub async fn advance(&self, by: Duration) -> usize {
        let due: Vec<(&'static str, TickFn, Arc<AtomicBool>, u128)> = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.retain(|e| !e.stopped.load(Ordering::SeqCst));
            entries
                .iter_mut()
                .filter_map(|entry| {
                    entry.elapsed += by;
                    let period = entry.period.as_nanos().max(1);
                    let count = entry.elapsed.as_nanos() / period;
                    let remainder = entry.elapsed.as_nanos() % period;
                    entry.elapsed = Duration::from_nanos(remainder as u64);
                    (count > 0).then(|| (entry.name, entry.tick.clone(), entry.stopped.clone(), count))
                })
                .collect()
        };

        let mut fired = 0;
        for (name, tick, stopped, count) in due {
            for _ in 0..count {
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                fired += 1;
                tracing::trace!(task = name, "manual tick");
                if tick().await == TickOutcome::Stop {
                    stopped.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, name: &'static str, period: Duration, tick: TickFn) -> Box<dyn ScheduledTask> {
        let stopped = Arc::new(AtomicBool::new(false));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ManualEntry {
                name,
                period,
                elapsed: Duration::ZERO,
                tick,
                stopped: stopped.clone(),
            });
        Box::new(ManualTask { stopped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_tick(counter: Arc<AtomicUsize>, stop_after: Option<usize>) -> TickFn {
        Arc::new(move || -> TickFuture {
            let counter = counter.clone();
            Box::pin(async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                match stop_after {
                    Some(limit) if n >= limit => TickOutcome::Stop,
                    _ => TickOutcome::Continue,
                }
            })
        })
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_ticks_every_period_until_stopped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = TokioScheduler.schedule("test", Duration::from_secs(10), counting_tick(counter.clone(), None));

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(task.is_running());

        task.stop();
        tokio::time::sleep(Duration::from_secs(100)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_honours_stop_outcome() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = TokioScheduler.schedule("test", Duration::from_secs(1), counting_tick(counter.clone(), Some(2)));

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        drop(TokioScheduler.schedule("test", Duration::from_secs(1), counting_tick(counter.clone(), None)));

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn manual_scheduler_fires_due_ticks() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let task = scheduler.schedule("test", Duration::from_secs(60), counting_tick(counter.clone(), None));

        assert_eq!(scheduler.advance(Duration::from_secs(59)).await, 0);
        assert_eq!(scheduler.advance(Duration::from_secs(1)).await, 1);
        assert_eq!(scheduler.advance(Duration::from_secs(180)).await, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 4);

        task.stop();
        assert_eq!(scheduler.advance(Duration::from_secs(600)).await, 0);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test]
    async fn manual_scheduler_stops_on_stop_outcome() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let task = scheduler.schedule("test", Duration::from_secs(1), counting_tick(counter.clone(), Some(1)));

        assert_eq!(scheduler.advance(Duration::from_secs(5)).await, 1);
        assert!(!task.is_running());
        assert_eq!(scheduler.active_count(), 0);
    }
}
