//! Video frame types and processing

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use image::ImageFormat;
use tracing::debug;

use crate::CaptureError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Frame sequence number (monotonic per stream)
    pub sequence: u64,
    /// Capture instant (monotonic clock)
    pub captured_at: Instant,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        sequence: u64,
        captured_at: Instant,
    ) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CaptureError::InvalidDimensions {
                width,
                height,
                len: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            sequence,
            captured_at,
        })
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Crop a region of the frame, keeping sequence and capture instant
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        let fits = |start: u32, len: u32, bound: u32| start.checked_add(len).map_or(false, |end| end <= bound);
        if w == 0 || h == 0 || !fits(x, w, self.width) || !fits(y, h, self.height) {
            return None;
        }

        let mut cropped = Vec::with_capacity((w * h * 3) as usize);
        for row in y..(y + h) {
            let start = ((row * self.width + x) * 3) as usize;
            let end = start + (w * 3) as usize;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Some(VideoFrame {
            data: cropped,
            width: w,
            height: h,
            sequence: self.sequence,
            captured_at: self.captured_at,
        })
    }

    /// Time elapsed between capture and `now`
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.captured_at)
    }
}

/// Assigns monotonically increasing sequence numbers to frames of one stream
#[derive(Debug, Default)]
pub struct FrameStamper {
    next: AtomicU64,
}

impl FrameStamper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap raw RGB data into a frame captured now
    pub fn stamp(&self, data: Vec<u8>, width: u32, height: u32) -> Result<VideoFrame, CaptureError> {
        let sequence = self.next.fetch_add(1, Ordering::Relaxed);
        VideoFrame::new(data, width, height, sequence, Instant::now())
    }

    /// Number of sequence numbers handed out so far
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Decode a JPEG frame to RGB, returning `(data, width, height)`
pub fn decode_jpeg(jpeg: &[u8]) -> Result<(Vec<u8>, u32, u32), CaptureError> {
    let img = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
        .map_err(|e| CaptureError::Decode(e.to_string()))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    debug!("Decoded JPEG frame {}x{}", width, height);

    Ok((rgb.into_raw(), width, height))
}
