//! Logical one-second clock.
//!
//! Every call to [`Clock::ticks`] starts an independent tick sequence at 0.
//! Dropping the returned [`Ticks`] cancels it; nothing fires afterwards.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    period: Duration,
}

impl Clock {
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
        }
    }

    /// Clock whose logical second lasts `period`. Clamped to at least 1ms.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Subscribe to a fresh tick sequence. The first tick lands one period
    /// from now. Must be called inside a tokio runtime.
    pub fn ticks(&self) -> Ticks {
        let mut interval = time::interval_at(Instant::now() + self.period, self.period);
        // Logical ticks: a stalled consumer shifts the schedule instead of bursting.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ticks { interval, next: 0 }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// A live clock subscription.
#[derive(Debug)]
pub struct Ticks {
    interval: Interval,
    next: u64,
}

impl Ticks {
    /// Wait for the next tick and return its sequence number.
    ///
    /// Cancel safe: dropping the future before it resolves consumes no tick.
    pub async fn tick(&mut self) -> u64 {
        self.interval.tick().await;
        let n = self.next;
        self.next += 1;
        n
    }
}
