//! Scheduler for the daily cycle
//!
//! This module handles:
//! - Tracking the next daily trigger instant
//! - Polling the wall clock on a short fixed interval
//! - Running one cycle at a time, inline in the polling task
//! - Stopping cleanly when the cancellation token fires

mod cycle;
mod trigger;

pub use cycle::{CycleReport, NotificationOutcome, Pipeline};
pub use trigger::{Clock, DailyTrigger, SystemClock};

use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default interval between two wall-clock checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Waits for the daily trigger and runs the pipeline
///
/// The scheduler has two states: waiting for the trigger, and running a
/// cycle. A cycle is awaited inside the polling loop, so a trigger that comes
/// due while one is running is only looked at after it finishes.
pub struct Scheduler {
    pipeline: Pipeline,
    trigger: DailyTrigger,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler whose first run is the next occurrence of the
    /// configured trigger time, read from the pipeline's clock.
    pub fn new(pipeline: Pipeline, cancel: CancellationToken) -> Self {
        let clock = pipeline.clock();
        let trigger = DailyTrigger::new(pipeline.config().schedule.trigger_time, clock.now());

        Self {
            pipeline,
            trigger,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.trigger.next_run()
    }

    /// Checks the clock once and runs a cycle if the trigger is due
    ///
    /// # Returns
    ///
    /// * `Some(CycleReport)` - A cycle ran; the trigger moved forward
    /// * `None` - Not due yet
    pub async fn tick(&mut self) -> Option<CycleReport> {
        let started_at = self.clock.now();
        if !self.trigger.is_due(started_at) {
            return None;
        }

        tracing::info!("Trigger time {} reached", self.trigger.next_run());
        let report = self.pipeline.run_cycle(&self.cancel).await;
        report.log();

        self.trigger.advance(started_at, self.clock.now());
        tracing::info!("Next run scheduled for {}", self.trigger.next_run());

        Some(report)
    }

    /// Polls until cancelled and returns the number of cycles that ran
    pub async fn run(mut self) -> u64 {
        tracing::info!(
            "Scheduler started, next run at {}",
            self.trigger.next_run()
        );

        let mut cycles = 0;
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            if self.tick().await.is_some() {
                cycles += 1;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!("Scheduler stopped after {} cycles", cycles);
        cycles
    }
}
