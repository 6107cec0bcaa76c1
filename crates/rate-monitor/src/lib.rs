//! Throughput Rate Monitor
//!
//! Counts events from any thread and reports the per-period count to a
//! callback on its own timer thread. Used for frame-rate diagnostics only.

mod monitor;

pub use monitor::{RateMonitor, DEFAULT_PERIOD};
