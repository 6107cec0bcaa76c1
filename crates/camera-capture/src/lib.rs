//! Camera Capture Types for the Safety Pipeline
//!
//! Frames arrive from the road-facing camera producer (hardware access lives
//! outside this crate). This crate provides:
//! - `VideoFrame`: decoded RGB payload with sequence number and capture instant
//! - `FrameStamper`: monotonic sequence assignment for a camera stream
//! - JPEG decoding for producers that deliver compressed frames

pub mod frame;

pub use frame::{decode_jpeg, FrameStamper, VideoFrame};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Invalid frame dimensions: {width}x{height} with {len} bytes")]
    InvalidDimensions { width: u32, height: u32, len: usize },
}
