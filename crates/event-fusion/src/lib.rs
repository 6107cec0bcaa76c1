//! Event Fusion Engine
//!
//! Correlates the vehicle's sensor feeds into risk signals:
//! - Camera frames (bounded drop-oldest intake, one consumer thread)
//! - Positioning (latest speed sample)
//! - Traffic signs (host submissions and the sign recognizer)
//!
//! Each processed frame yields a `RiskAssessment`, published through an
//! `Observable` and mapped to voice alerts for the `AlertArbiter`.

mod config;
mod coordinator;
mod cycle;
mod observable;
mod stats;

pub use config::FusionConfig;
pub use coordinator::{Collaborators, SensorFusionCoordinator};
pub use cycle::{alerts_for, FusionCycle, SensorSlots, COLLISION_MESSAGE, LANE_DEPARTURE_MESSAGE};
pub use observable::{Observable, SubscriptionId};
pub use stats::{PipelineStats, StatsSnapshot};

use thiserror::Error;

/// Fusion error types
#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Coordinator is shut down")]
    ShutDown,

    #[error("Failed to spawn {0} thread: {1}")]
    Spawn(&'static str, std::io::Error),

    #[error("Frame rejected: {0}")]
    Capture(#[from] camera_capture::CaptureError),

    #[error("Alerting error: {0}")]
    Alert(#[from] alerting::AlertError),
}
