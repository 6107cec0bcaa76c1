//! Drop-Oldest Frame Buffer Implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::BufferError;

/// Default buffer capacity (keep-only-latest window of 3 frames)
pub const DEFAULT_CAPACITY: usize = 3;

/// Result of offering a frame to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Frame admitted, nothing evicted
    Accepted,
    /// Frame admitted after releasing the oldest queued frame
    EvictedOldest,
    /// Buffer is shut down, the offered frame was released
    Closed,
}

struct State<T> {
    queue: VecDeque<T>,
    closed: bool,
}

/// Bounded single-consumer frame queue with drop-oldest backpressure
pub struct FrameBuffer<T> {
    /// Queued frames and the shutdown flag
    state: Mutex<State<T>>,
    /// Signalled when a frame is queued or the buffer closes
    available: Condvar,
    /// Maximum queued frames
    capacity: usize,
    /// Total frames offered while open (for statistics)
    total_offered: AtomicU64,
    /// Total frames evicted by backpressure (for statistics)
    total_evicted: AtomicU64,
}

impl<T> FrameBuffer<T> {
    /// Create a new frame buffer holding at most `capacity` frames
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
            total_offered: AtomicU64::new(0),
            total_evicted: AtomicU64::new(0),
        }
    }

    /// Create a buffer with default capacity (3 frames)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Offer a frame without blocking (evicts the oldest if full)
    pub fn offer(&self, frame: T) -> Offer {
        let evicted = {
            let mut state = self.state.lock();
            if state.closed {
                return Offer::Closed;
            }

            self.total_offered.fetch_add(1, Ordering::Relaxed);
            let evicted = if state.queue.len() >= self.capacity {
                state.queue.pop_front()
            } else {
                None
            };
            state.queue.push_back(frame);
            evicted
        };
        self.available.notify_one();

        match evicted {
            Some(oldest) => {
                drop(oldest);
                let total = self.total_evicted.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Frame buffer full, evicted oldest frame (total evicted: {})", total);
                Offer::EvictedOldest
            }
            None => Offer::Accepted,
        }
    }

    /// Block until a frame is available and take ownership of it
    pub fn take(&self) -> Result<T, BufferError> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(BufferError::Closed);
            }
            if let Some(frame) = state.queue.pop_front() {
                return Ok(frame);
            }
            self.available.wait(&mut state);
        }
    }

    /// Close the buffer, release queued frames and wake blocked consumers.
    /// Returns the number of frames released.
    pub fn shutdown(&self) -> usize {
        let released: Vec<T> = {
            let mut state = self.state.lock();
            if state.closed {
                return 0;
            }
            state.closed = true;
            state.queue.drain(..).collect()
        };
        self.available.notify_all();

        let count = released.len();
        drop(released);
        info!("Frame buffer shut down, released {} queued frames", count);
        count
    }

    /// Whether `shutdown` has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Get the number of frames currently queued
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get total frames offered while open
    pub fn total_offered(&self) -> u64 {
        self.total_offered.load(Ordering::Relaxed)
    }

    /// Get total frames evicted by backpressure
    pub fn total_evicted(&self) -> u64 {
        self.total_evicted.load(Ordering::Relaxed)
    }
}

impl<T> Default for FrameBuffer<T> {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
