//! Object detection results (vehicles, pedestrians)

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};

use crate::AdasError;

/// COCO class id for people
pub const COCO_PERSON: u32 = 0;

/// COCO class ids treated as vehicles (car, bus, truck)
pub const COCO_VEHICLES: [u32; 3] = [2, 5, 7];

/// Detected object, produced fresh per processed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Detection {
    Vehicle {
        /// Bounding box [left, top, right, bottom]
        bbox: [f32; 4],
        /// Detection confidence
        confidence: f32,
        /// Detector class id
        class_id: u32,
        /// Approach speed relative to the ego vehicle (m/s)
        closing_speed: f32,
    },
    Person {
        /// Bounding box [left, top, right, bottom]
        bbox: [f32; 4],
        /// Detection confidence
        confidence: f32,
    },
}

impl Detection {
    /// Vehicle with no closing speed estimate yet
    pub fn vehicle(bbox: [f32; 4], confidence: f32, class_id: u32) -> Self {
        Detection::Vehicle {
            bbox,
            confidence,
            class_id,
            closing_speed: 0.0,
        }
    }

    pub fn person(bbox: [f32; 4], confidence: f32) -> Self {
        Detection::Person { bbox, confidence }
    }

    /// Map a COCO detector output to a detection; other classes are dropped
    pub fn from_coco(class_id: u32, bbox: [f32; 4], confidence: f32) -> Option<Self> {
        if class_id == COCO_PERSON {
            Some(Self::person(bbox, confidence))
        } else if COCO_VEHICLES.contains(&class_id) {
            Some(Self::vehicle(bbox, confidence, class_id))
        } else {
            None
        }
    }

    /// Copy of this detection with the closing speed set (vehicles only)
    pub fn with_closing_speed(self, speed_mps: f32) -> Self {
        match self {
            Detection::Vehicle {
                bbox,
                confidence,
                class_id,
                ..
            } => Detection::Vehicle {
                bbox,
                confidence,
                class_id,
                closing_speed: speed_mps,
            },
            person @ Detection::Person { .. } => person,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Detection::Vehicle { confidence, .. } | Detection::Person { confidence, .. } => {
                *confidence
            }
        }
    }

    pub fn bbox(&self) -> [f32; 4] {
        match self {
            Detection::Vehicle { bbox, .. } | Detection::Person { bbox, .. } => *bbox,
        }
    }
}

/// Object detection model (opaque: frame in, detections out)
pub trait ObjectDetector: Send {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<Detection>, AdasError>;
}

/// Supplies per-vehicle closing speed across frames before aggregation
pub trait ClosingSpeedTracker: Send {
    fn enrich(&mut self, frame: &VideoFrame, detections: Vec<Detection>) -> Vec<Detection>;
}

/// Tracker that leaves detections as the detector produced them
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTracking;

impl ClosingSpeedTracker for NoTracking {
    fn enrich(&mut self, _frame: &VideoFrame, detections: Vec<Detection>) -> Vec<Detection> {
        detections
    }
}
