//! Traffic sign recognition

use std::time::{Duration, Instant};

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};

use crate::AdasError;

/// Traffic sign types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficSign {
    /// Speed limit (km/h)
    SpeedLimit(u32),
    /// Stop sign
    Stop,
    /// Yield sign
    Yield,
    /// No entry
    NoEntry,
    /// Pedestrian crossing
    PedestrianCrossing,
    /// School zone
    SchoolZone,
    /// Road works
    Construction,
    /// Unknown sign
    Unknown,
}

impl TrafficSign {
    /// Parse a classifier label such as `speed_50` or `stop`
    pub fn parse(label: &str) -> Self {
        if let Some(limit) = label.strip_prefix("speed_") {
            return match limit.parse::<u32>() {
                Ok(limit) if limit > 0 => TrafficSign::SpeedLimit(limit),
                _ => TrafficSign::Unknown,
            };
        }

        match label {
            "stop" => TrafficSign::Stop,
            "yield" => TrafficSign::Yield,
            "no_entry" => TrafficSign::NoEntry,
            "pedestrian_crossing" => TrafficSign::PedestrianCrossing,
            "school_zone" => TrafficSign::SchoolZone,
            "construction" => TrafficSign::Construction,
            _ => TrafficSign::Unknown,
        }
    }

    pub fn speed_limit(&self) -> Option<u32> {
        match self {
            TrafficSign::SpeedLimit(limit) => Some(*limit),
            _ => None,
        }
    }
}

/// Latest recognized sign (last-write-wins)
#[derive(Debug, Clone, PartialEq)]
pub struct SignReading {
    /// Classifier label
    pub label: String,
    /// Classifier confidence
    pub confidence: f32,
    /// Speed limit implied by the label (km/h)
    pub derived_speed_limit: Option<u32>,
    /// Recognition instant (monotonic clock)
    pub observed_at: Instant,
}

impl SignReading {
    /// Build a reading from a classifier label, deriving the speed limit
    pub fn from_label(label: impl Into<String>, confidence: f32, observed_at: Instant) -> Self {
        let label = label.into();
        let derived_speed_limit = TrafficSign::parse(&label).speed_limit();
        Self {
            label,
            confidence,
            derived_speed_limit,
            observed_at,
        }
    }

    pub fn sign(&self) -> TrafficSign {
        TrafficSign::parse(&self.label)
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.observed_at)
    }
}

/// Sign classification model (opaque: cropped frame in, reading out)
pub trait SignRecognizer: Send {
    /// `Ok(None)` when no sign is visible this cycle
    fn recognize(&self, frame: &VideoFrame) -> Result<Option<SignReading>, AdasError>;
}
