//! ADAS risk assessment

use serde::{Deserialize, Serialize};

/// Risk signals derived from one fusion cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// A vehicle is closing faster than the collision threshold
    pub collision_risk: bool,

    /// Current speed exceeds the active speed limit
    pub speed_violation: bool,

    /// Lane collaborator reports a departure
    pub lane_departure: bool,

    /// Vehicle speed (km/h) from the latest location sample
    pub current_speed_kmh: f32,

    /// Active speed limit (km/h), fresh or retained
    pub speed_limit: Option<u32>,
}

impl RiskAssessment {
    /// Check if any risk signal is raised
    pub fn any_risk(&self) -> bool {
        self.collision_risk || self.speed_violation || self.lane_departure
    }

    /// Collision risk is the only critical signal
    pub fn is_critical(&self) -> bool {
        self.collision_risk
    }
}
