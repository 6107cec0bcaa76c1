//! Positioning samples

use std::time::{Duration, Instant};

/// Meters per second to kilometers per hour
pub const MPS_TO_KMH: f32 = 3.6;

/// Latest vehicle speed from the positioning feed (last-write-wins)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSample {
    /// Ground speed (m/s)
    pub speed_mps: f32,
    /// Fix instant (monotonic clock)
    pub timestamp: Instant,
}

impl LocationSample {
    pub fn new(speed_mps: f32, timestamp: Instant) -> Self {
        Self { speed_mps, timestamp }
    }

    /// Sample stamped with the current instant
    pub fn now(speed_mps: f32) -> Self {
        Self::new(speed_mps, Instant::now())
    }

    pub fn speed_kmh(&self) -> f32 {
        self.speed_mps * MPS_TO_KMH
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }
}
