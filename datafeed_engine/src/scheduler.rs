//! Fixed-interval scheduler for unattended batch sync.
//!
//! One background task drives a `tokio` interval; the batch runs inline in
//! the tick arm, so a slow batch delays the next tick instead of launching
//! a second overlapping run. The stop flag is a watch channel observed only
//! between batches, never mid-fetch.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use market_source::models::SeriesKey;

use crate::sync::SyncCoordinator;

/// Lifecycle of the background batch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Never started.
    Idle,
    /// Background task live, ticking at the configured interval.
    Running,
    /// Stopped by request; a fresh `start` is allowed.
    Stopped,
}

/// Invalid lifecycle transition.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start` was called while the background task is live.
    #[error("scheduler is already running")]
    AlreadyRunning,
}

/// Periodically runs the batch sync for a fixed plan.
pub struct Scheduler {
    coordinator: Arc<SyncCoordinator>,
    plan: Vec<(SeriesKey, i64)>,
    period: Duration,
    state: SchedulerState,
    task: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

impl Scheduler {
    /// Builds an idle scheduler; nothing runs until [`Scheduler::start`].
    pub fn new(coordinator: Arc<SyncCoordinator>, plan: Vec<(SeriesKey, i64)>, period: Duration) -> Self {
        Self { coordinator, plan, period, state: SchedulerState::Idle, task: None }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Spawns the background task. The first batch fires one full period
    /// after start, matching the upstream-friendly cadence of the interval.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.state == SchedulerState::Running {
            return Err(SchedulerError::AlreadyRunning);
        }
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let coordinator = Arc::clone(&self.coordinator);
        let plan = self.plan.clone();
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // A batch slower than the period delays the next tick rather
            // than stacking a second run.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The interval's first tick completes immediately; consume it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        // Per-series failures are already collected in the
                        // report; nothing escapes far enough to kill the
                        // task, so the next tick always fires.
                        let report = coordinator.sync_batch(&plan).await;
                        info!(
                            series = report.results.len(),
                            inserted = report.total_inserted(),
                            failed = report.failures().count(),
                            "scheduled batch complete"
                        );
                    }
                }
            }
        });

        self.task = Some((stop_tx, handle));
        self.state = SchedulerState::Running;
        info!(period_secs = self.period.as_secs(), "scheduler started");
        Ok(())
    }

    /// Requests a stop and waits up to `wait` for any in-flight batch to
    /// finish; after that the task is aborted. No-op unless running.
    pub async fn stop(&mut self, wait: Duration) {
        let Some((stop_tx, mut handle)) = self.task.take() else {
            return;
        };
        let _ = stop_tx.send(true);
        if tokio::time::timeout(wait, &mut handle).await.is_err() {
            warn!("in-flight batch exceeded stop timeout, aborting");
            handle.abort();
        }
        self.state = SchedulerState::Stopped;
        info!("scheduler stopped");
    }
}
