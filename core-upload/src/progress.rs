//! Progress tracking for one transfer attempt.
//!
//! Progress is push-based: the session forwards [`ProgressSnapshot`]s to the
//! caller's channel in strictly non-decreasing byte order, and nothing is
//! ever delivered after the attempt's terminal outcome. `stalled` is not a
//! phase here; it is a deadline outcome (see `deadline`) layered on a
//! running transfer.

use std::time::Duration;
use tokio::time::Instant;

/// Lower edge of the completion band where this store habitually gets stuck.
const STUCK_BAND_LOW: f64 = 0.15;
/// Upper edge of the stuck band.
const STUCK_BAND_HIGH: f64 = 0.25;
/// Quiet time inside the band before the diagnostic fires.
const STUCK_BAND_QUIET: Duration = Duration::from_secs(10);

/// Lifecycle phase of one transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TransferPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// Point-in-time view of a running transfer.
#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    /// Completion ratio in `[0.0, 1.0]`
    pub ratio: f64,
    /// Instantaneous transfer rate since the previous snapshot
    pub bytes_per_second: f64,
    /// How long the transfer has been quiet
    pub since_last_progress: Duration,
}

/// Enforces the progress invariants for one attempt.
///
/// Reported byte counts are clamped monotonic non-decreasing and bounded by
/// the total; regressions from the store are ignored rather than forwarded.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    total_bytes: u64,
    bytes: u64,
    last_progress_at: Instant,
    last_snapshot_at: Instant,
    last_snapshot_bytes: u64,
    band_flagged: bool,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64) -> Self {
        let now = Instant::now();
        Self {
            total_bytes,
            bytes: 0,
            last_progress_at: now,
            last_snapshot_at: now,
            last_snapshot_bytes: 0,
            band_flagged: false,
        }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.bytes as f64 / self.total_bytes as f64
        }
    }

    /// Record a byte count reported by the store.
    ///
    /// Returns a snapshot only when bytes actually advanced; duplicate and
    /// regressed reports produce nothing.
    pub fn record(&mut self, reported: u64) -> Option<ProgressSnapshot> {
        let clamped = reported.min(self.total_bytes).max(self.bytes);
        if clamped == self.bytes {
            return None;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_snapshot_at);
        let rate = if elapsed.is_zero() {
            0.0
        } else {
            (clamped - self.last_snapshot_bytes) as f64 / elapsed.as_secs_f64()
        };

        self.bytes = clamped;
        self.last_progress_at = now;
        self.last_snapshot_at = now;
        self.last_snapshot_bytes = clamped;

        Some(ProgressSnapshot {
            bytes_transferred: self.bytes,
            total_bytes: self.total_bytes,
            ratio: self.ratio(),
            bytes_per_second: rate,
            since_last_progress: Duration::ZERO,
        })
    }

    /// Snapshot of the current position without byte movement, emitted on
    /// the heartbeat interval so observers see quiet time accumulate.
    pub fn heartbeat(&mut self) -> ProgressSnapshot {
        let now = Instant::now();
        self.last_snapshot_at = now;
        self.last_snapshot_bytes = self.bytes;

        ProgressSnapshot {
            bytes_transferred: self.bytes,
            total_bytes: self.total_bytes,
            ratio: self.ratio(),
            bytes_per_second: 0.0,
            since_last_progress: now.duration_since(self.last_progress_at),
        }
    }

    /// Diagnostic-only heuristic for this store's habit of freezing between
    /// 15% and 25% completion. Fires at most once per attempt and must never
    /// influence retry or fallback decisions.
    pub fn entered_stuck_band(&mut self) -> bool {
        if self.band_flagged {
            return false;
        }
        let ratio = self.ratio();
        let quiet = self.last_progress_at.elapsed();
        if (STUCK_BAND_LOW..=STUCK_BAND_HIGH).contains(&ratio) && quiet > STUCK_BAND_QUIET {
            self.band_flagged = true;
            return true;
        }
        false
    }
}
