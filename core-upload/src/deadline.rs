//! Deadline supervision for one transfer attempt.
//!
//! Exactly two timers per attempt, consolidated in one value object instead
//! of scattered across callbacks: a stall timer that resets whenever bytes
//! advance, and a total timer fixed at attempt start that fires regardless
//! of progress. The clock is owned by the attempt that created it and is
//! dropped on every exit path - success, failure or cancellation - which is
//! the single teardown that clears both timers. No timer outlives its
//! attempt.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep_until, Instant, Sleep};

/// Which deadline fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineExpiry {
    /// No byte progress within the stall window
    Stalled,
    /// The attempt's wall-clock ceiling elapsed, progress or not
    TimedOut,
}

/// The two timers supervising one attempt.
#[derive(Debug)]
pub struct DeadlineClock {
    stall_window: Duration,
    total_ceiling: Duration,
    stall: Pin<Box<Sleep>>,
    total: Pin<Box<Sleep>>,
}

impl DeadlineClock {
    /// Arm both timers. The total deadline is fixed from this moment.
    pub fn start(stall_window: Duration, total_ceiling: Duration) -> Self {
        let now = Instant::now();
        Self {
            stall_window,
            total_ceiling,
            stall: Box::pin(sleep_until(now + stall_window)),
            total: Box::pin(sleep_until(now + total_ceiling)),
        }
    }

    /// Push the stall deadline out by one window. Called on byte progress;
    /// the total deadline is deliberately untouched.
    pub fn record_progress(&mut self) {
        self.stall.as_mut().reset(Instant::now() + self.stall_window);
    }

    /// Resolves when either deadline fires. The total timer wins ties, so a
    /// transfer that is both stalled and out of budget reports `TimedOut`.
    pub async fn expired(&mut self) -> DeadlineExpiry {
        tokio::select! {
            biased;
            _ = self.total.as_mut() => DeadlineExpiry::TimedOut,
            _ = self.stall.as_mut() => DeadlineExpiry::Stalled,
        }
    }

    pub fn stall_window(&self) -> Duration {
        self.stall_window
    }

    pub fn total_ceiling(&self) -> Duration {
        self.total_ceiling
    }
}
