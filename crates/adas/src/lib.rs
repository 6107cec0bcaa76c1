//! Advanced Driver Assistance System (ADAS)
//!
//! Road scene risk assessment from opaque perception collaborators:
//! - Object detection results (vehicles, pedestrians) with closing speed
//! - Lane departure signal
//! - Traffic sign readings and sticky speed limits
//! - Vehicle speed from the positioning feed
//!
//! The models themselves are external; this crate defines their contracts
//! and the aggregation of their outputs into a `RiskAssessment`.

pub mod aggregator;
pub mod analysis;
pub mod config;
pub mod lane;
pub mod location;
pub mod object;
pub mod sign;

pub use aggregator::{DetectionAggregator, FusionInputs};
pub use analysis::RiskAssessment;
pub use config::AdasConfig;
pub use lane::LaneDetector;
pub use location::LocationSample;
pub use object::{ClosingSpeedTracker, Detection, NoTracking, ObjectDetector};
pub use sign::{SignReading, SignRecognizer, TrafficSign};

use camera_capture::VideoFrame;
use thiserror::Error;

/// ADAS error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdasError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Stand-in for perception models that are not loaded.
///
/// Every call fails with `ModelUnavailable`, which the pipeline degrades to
/// an empty result for the cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unloaded;

impl ObjectDetector for Unloaded {
    fn detect(&self, _frame: &VideoFrame) -> Result<Vec<Detection>, AdasError> {
        Err(AdasError::ModelUnavailable("object detection model not loaded".to_string()))
    }
}

impl LaneDetector for Unloaded {
    fn detect_departure(&self, _frame: &VideoFrame) -> Result<bool, AdasError> {
        Err(AdasError::ModelUnavailable("lane model not loaded".to_string()))
    }
}

impl SignRecognizer for Unloaded {
    fn recognize(&self, _frame: &VideoFrame) -> Result<Option<SignReading>, AdasError> {
        Err(AdasError::ModelUnavailable("sign model not loaded".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_unloaded_models_report_unavailable() {
        let frame = VideoFrame::new(vec![0; 12], 2, 2, 0, Instant::now()).unwrap();

        assert!(matches!(
            ObjectDetector::detect(&Unloaded, &frame),
            Err(AdasError::ModelUnavailable(_))
        ));
        assert!(matches!(
            Unloaded.detect_departure(&frame),
            Err(AdasError::ModelUnavailable(_))
        ));
        assert!(matches!(
            Unloaded.recognize(&frame),
            Err(AdasError::ModelUnavailable(_))
        ));
    }
}
