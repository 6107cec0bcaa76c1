//! ADAS configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ADAS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdasConfig {
    /// Object detection confidence threshold
    pub object_confidence: f32,

    /// Closing speed above which a vehicle is a collision risk (m/s, 5.5 ≈ 20 km/h)
    pub closing_speed_threshold_mps: f32,

    /// Maximum age of a location or sign signal used for a decision (ms)
    pub staleness_budget_ms: u64,

    /// Sign reading confidence threshold
    pub sign_confidence: f32,

    /// How long a sticky speed limit survives without a fresh sign (ms, None = until superseded)
    pub speed_limit_retention_ms: Option<u64>,

    /// Lane departure warning enabled
    pub lane_departure_enabled: bool,

    /// Traffic sign recognition enabled
    pub sign_detection_enabled: bool,

    /// Region handed to the sign recognizer [x, y, width, height] (None = full frame)
    pub sign_roi: Option<[u32; 4]>,
}

impl Default for AdasConfig {
    fn default() -> Self {
        Self {
            object_confidence: 0.5,
            closing_speed_threshold_mps: 5.5,
            staleness_budget_ms: 3000,
            sign_confidence: 0.5,
            speed_limit_retention_ms: None,
            lane_departure_enabled: true,
            sign_detection_enabled: true,
            sign_roi: None,
        }
    }
}

impl AdasConfig {
    pub fn staleness_budget(&self) -> Duration {
        Duration::from_millis(self.staleness_budget_ms)
    }

    pub fn speed_limit_retention(&self) -> Option<Duration> {
        self.speed_limit_retention_ms.map(Duration::from_millis)
    }
}
