//! Daily trigger bookkeeping

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The machine's local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Tracks the next instant a daily cycle is due
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTrigger {
    time: NaiveTime,
    next_run: NaiveDateTime,
}

impl DailyTrigger {
    /// Schedules the first run at today's `time` if still ahead of `now`,
    /// otherwise tomorrow's.
    pub fn new(time: NaiveTime, now: NaiveDateTime) -> Self {
        Self {
            time,
            next_run: occurrence_after(time, now),
        }
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now >= self.next_run
    }

    /// Moves to the first occurrence after `started_at`, the instant the
    /// cycle that just finished began.
    ///
    /// Occurrences that were already past when the cycle began are dropped.
    /// If one or more came due while it ran, the most recent of them stays
    /// due so it fires once right away.
    pub fn advance(&mut self, started_at: NaiveDateTime, completed_at: NaiveDateTime) {
        let mut next = occurrence_after(self.time, started_at);
        while next + Duration::days(1) <= completed_at {
            next += Duration::days(1);
        }
        self.next_run = next;
    }
}

/// First instant strictly after `now` whose time of day is `time`
fn occurrence_after(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}
