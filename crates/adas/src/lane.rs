//! Lane departure detection

use camera_capture::VideoFrame;

use crate::AdasError;

/// Lane edge detection model (opaque: frame in, departure signal out)
pub trait LaneDetector: Send {
    fn detect_departure(&self, frame: &VideoFrame) -> Result<bool, AdasError>;
}
