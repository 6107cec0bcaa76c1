//! Fusion configuration

use adas::AdasConfig;
use alerting::AlertConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fusion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Frames buffered between the camera and the consumer
    pub frame_capacity: usize,
    /// Frame rate sampling period (ms)
    pub rate_period_ms: u64,
    pub adas: AdasConfig,
    pub alerts: AlertConfig,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            frame_capacity: frame_buffer::DEFAULT_CAPACITY,
            rate_period_ms: 1000,
            adas: AdasConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl FusionConfig {
    pub fn rate_period(&self) -> Duration {
        Duration::from_millis(self.rate_period_ms.max(1))
    }
}
