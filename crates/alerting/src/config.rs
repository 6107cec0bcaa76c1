//! Alert configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Maximum queued alerts while an utterance is active
    pub max_pending: usize,
    /// Speech rate for urgent alerts
    pub urgent_rate: f32,
    /// Speech volume for urgent alerts (0.0 to 1.0)
    pub urgent_volume: f32,
    /// Speech rate for normal alerts
    pub normal_rate: f32,
    /// Speech volume for normal alerts (0.0 to 1.0)
    pub normal_volume: f32,
    /// Cooldown between repeats of a normal alert kind (milliseconds)
    pub cooldown_ms: u64,
    /// Cooldown between repeats of an urgent alert kind (milliseconds)
    pub urgent_cooldown_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            max_pending: 8,
            urgent_rate: 1.1,
            urgent_volume: 1.0,
            normal_rate: 0.9,
            normal_volume: 0.8,
            cooldown_ms: 5000,
            urgent_cooldown_ms: 2000,
        }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn urgent_cooldown(&self) -> Duration {
        Duration::from_millis(self.urgent_cooldown_ms)
    }
}
