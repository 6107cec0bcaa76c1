//! Pipeline counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by the producers and the consumer thread
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub frames_offered: AtomicU64,
    pub frames_evicted: AtomicU64,
    pub frames_processed: AtomicU64,
    pub inference_failures: AtomicU64,
    pub lane_failures: AtomicU64,
    pub sign_failures: AtomicU64,
    pub stale_location_cycles: AtomicU64,
    pub alerts_submitted: AtomicU64,
    pub alerts_suppressed: AtomicU64,
    pub alerts_dropped: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_offered: self.frames_offered.load(Ordering::Relaxed),
            frames_evicted: self.frames_evicted.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            inference_failures: self.inference_failures.load(Ordering::Relaxed),
            lane_failures: self.lane_failures.load(Ordering::Relaxed),
            sign_failures: self.sign_failures.load(Ordering::Relaxed),
            stale_location_cycles: self.stale_location_cycles.load(Ordering::Relaxed),
            alerts_submitted: self.alerts_submitted.load(Ordering::Relaxed),
            alerts_suppressed: self.alerts_suppressed.load(Ordering::Relaxed),
            alerts_dropped: self.alerts_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `PipelineStats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames_offered: u64,
    pub frames_evicted: u64,
    pub frames_processed: u64,
    pub inference_failures: u64,
    pub lane_failures: u64,
    pub sign_failures: u64,
    pub stale_location_cycles: u64,
    pub alerts_submitted: u64,
    pub alerts_suppressed: u64,
    pub alerts_dropped: u64,
}
