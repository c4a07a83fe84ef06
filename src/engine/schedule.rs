// SPDX-License-Identifier: GPL-3.0-only

//! Cooperative tick schedule for the frame pump
//!
//! The engine never spawns threads. Shells call [`TickSchedule::take_due`]
//! from their own loop; once cancelled, the schedule reports nothing due
//! until it is scheduled again.

use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TickSchedule {
    interval: Duration,
    next_due: Option<Instant>,
}

impl TickSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.next_due.is_some()
    }

    /// Start ticking, first tick due immediately
    pub fn schedule(&mut self, now: Instant) {
        debug!(interval_ms = self.interval.as_millis() as u64, "Tick schedule armed");
        self.next_due = Some(now);
    }

    pub fn cancel(&mut self) {
        if self.next_due.take().is_some() {
            debug!("Tick schedule cancelled");
        }
    }

    /// Consume the pending tick if it is due at `now`
    ///
    /// Missed ticks are not replayed: a late caller gets one tick and the
    /// next one is due a full interval later.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let next = due + self.interval;
                self.next_due = Some(if next <= now { now + self.interval } else { next });
                true
            }
            _ => false,
        }
    }

    /// Time until the next tick, `None` when unscheduled
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}
