//! Repeating reminder timer.
//!
//! [`ReminderScheduler`] runs [`NotificationEngine::execute_due_schedules`]
//! once on `start` and then every `check_interval_ms`. Timer-driven cycles
//! log their failures and never tear the timer down; [`execute_now`]
//! propagates them instead.
//!
//! Each tick runs its cycle as a separate task behind a cycle gate. A tick
//! that finds the previous cycle still running is skipped, so cycles never
//! interleave.
//!
//! [`execute_now`]: ReminderScheduler::execute_now

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use aisle_core::reminder::{validate_check_interval, MIN_CHECK_INTERVAL_MS};
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::engine::{CycleSummary, NotificationEngine};
use crate::error::NotifyResult;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub check_interval_ms: u64,
    /// `None` while stopped.
    pub ms_until_next_run: Option<u64>,
}

struct Timer {
    cancel: CancellationToken,
    next_run: Arc<Mutex<Instant>>,
}

struct SchedulerState {
    interval: Duration,
    timer: Option<Timer>,
}

pub struct ReminderScheduler {
    engine: Arc<NotificationEngine>,
    cycle_gate: Arc<tokio::sync::Mutex<()>>,
    state: Mutex<SchedulerState>,
}

impl ReminderScheduler {
    pub fn new(engine: Arc<NotificationEngine>, config: SchedulerConfig) -> Self {
        let interval_ms = config.check_interval_ms.max(MIN_CHECK_INTERVAL_MS);
        Self {
            engine,
            cycle_gate: Arc::new(tokio::sync::Mutex::new(())),
            state: Mutex::new(SchedulerState {
                interval: Duration::from_millis(interval_ms),
                timer: None,
            }),
        }
    }

    /// Run a cycle now and then on every interval. No-op while running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut state = lock(&self.state);
        if state.timer.is_some() {
            tracing::debug!("Reminder scheduler already running");
            return;
        }
        let interval = state.interval;
        state.timer = Some(self.arm(Instant::now(), interval));
        tracing::info!(
            check_interval_ms = interval.as_millis() as u64,
            "Reminder scheduler started"
        );
    }

    /// Cancel the timer. A cycle already in flight runs to completion.
    pub fn stop(&self) {
        if let Some(timer) = lock(&self.state).timer.take() {
            timer.cancel.cancel();
            tracing::info!("Reminder scheduler stopped");
        }
    }

    /// Change the polling interval. A running timer is re-armed so the next
    /// cycle happens one new interval from now.
    pub fn update_interval(&self, interval_ms: u64) -> NotifyResult<()> {
        validate_check_interval(interval_ms)?;
        let interval = Duration::from_millis(interval_ms);

        let mut state = lock(&self.state);
        state.interval = interval;
        if let Some(timer) = state.timer.take() {
            timer.cancel.cancel();
            state.timer = Some(self.arm(Instant::now() + interval, interval));
        }
        tracing::info!(check_interval_ms = interval_ms, "Reminder check interval updated");
        Ok(())
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = lock(&self.state);
        SchedulerStatus {
            running: state.timer.is_some(),
            check_interval_ms: state.interval.as_millis() as u64,
            ms_until_next_run: state.timer.as_ref().map(|timer| {
                lock(&timer.next_run)
                    .saturating_duration_since(Instant::now())
                    .as_millis() as u64
            }),
        }
    }

    /// Run one cycle and wait for it, after any cycle already in flight.
    ///
    /// Unlike timer-driven cycles, the first schedule failure is returned.
    pub async fn execute_now(&self) -> NotifyResult<CycleSummary> {
        let _guard = self.cycle_gate.lock().await;
        self.engine.execute_due_schedules().await?.into_summary()
    }

    fn arm(&self, first_tick: Instant, period: Duration) -> Timer {
        let cancel = CancellationToken::new();
        let next_run = Arc::new(Mutex::new(first_tick));

        let engine = Arc::clone(&self.engine);
        let gate = Arc::clone(&self.cycle_gate);
        let task_cancel = cancel.clone();
        let task_next_run = Arc::clone(&next_run);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        tracing::debug!("Reminder timer cancelled");
                        break;
                    }
                    tick = ticker.tick() => {
                        *lock(&task_next_run) = tick + period;
                        tokio::spawn(run_timed_cycle(Arc::clone(&engine), Arc::clone(&gate)));
                    }
                }
            }
        });

        Timer { cancel, next_run }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.state).timer.take() {
            timer.cancel.cancel();
        }
    }
}

/// One timer-driven cycle. Every error is logged and swallowed.
async fn run_timed_cycle(engine: Arc<NotificationEngine>, gate: Arc<tokio::sync::Mutex<()>>) {
    let Ok(_guard) = gate.try_lock_owned() else {
        tracing::warn!("Previous reminder cycle still running, skipping tick");
        return;
    };

    match engine.execute_due_schedules().await {
        Ok(report) => {
            for failure in &report.failures {
                tracing::error!(
                    schedule_id = failure.schedule_id,
                    event_id = failure.event_id,
                    error = %failure.error,
                    "Reminder schedule failed"
                );
            }
            let summary = report.summary();
            if summary.total_executions > 0 {
                tracing::info!(
                    executions = summary.total_executions,
                    guests_processed = summary.guests_processed,
                    items_scheduled = summary.items_scheduled,
                    items_skipped = summary.items_skipped,
                    errors = summary.errors.len(),
                    "Reminder cycle complete"
                );
            } else {
                tracing::debug!("Reminder cycle complete, nothing due");
            }
        }
        Err(e) => tracing::error!(error = %e, "Reminder cycle failed"),
    }
}
