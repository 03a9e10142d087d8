//! Statistics tracking for the relay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Atomic request counters, reset on every snapshot.
pub struct Stats {
    pub requests: AtomicU64,
    pub answered: AtomicU64,
    pub rejected: AtomicU64,
    pub failed: AtomicU64,
    /// Cumulative response time in microseconds for averaging.
    total_response_time_us: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            answered: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
        }
    }

    pub fn record_answered(&self, elapsed: Duration) {
        self.record(&self.answered, elapsed);
    }

    pub fn record_rejected(&self, elapsed: Duration) {
        self.record(&self.rejected, elapsed);
    }

    pub fn record_failed(&self, elapsed: Duration) {
        self.record(&self.failed, elapsed);
    }

    fn record(&self, counter: &AtomicU64, elapsed: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        counter.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot_and_reset(&self) -> StatsSnapshot {
        let requests = self.requests.swap(0, Ordering::Relaxed);
        let answered = self.answered.swap(0, Ordering::Relaxed);
        let rejected = self.rejected.swap(0, Ordering::Relaxed);
        let failed = self.failed.swap(0, Ordering::Relaxed);
        let total_us = self.total_response_time_us.swap(0, Ordering::Relaxed);

        let avg_response_ms = if requests > 0 {
            (total_us as f64 / requests as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            requests,
            answered,
            rejected,
            failed,
            avg_response_ms,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub answered: u64,
    pub rejected: u64,
    pub failed: u64,
    pub avg_response_ms: f64,
}
