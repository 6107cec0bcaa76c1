//! Drop-Oldest Frame Buffer
//!
//! Bounded hand-off between the camera producer and the single frame consumer.
//! The producer never blocks: at capacity the oldest queued frame is released
//! to admit the new one, so the consumer always works on recent data.

mod buffer;

pub use buffer::{FrameBuffer, Offer, DEFAULT_CAPACITY};

use thiserror::Error;

/// Frame buffer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("Frame buffer is shut down")]
    Closed,
}
