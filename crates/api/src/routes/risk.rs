//! Risk Routes

use std::sync::Arc;

use adas::RiskAssessment;
use alerting::ArbiterStats;
use axum::{extract::State, Json};
use event_fusion::StatsSnapshot;
use serde::Serialize;

use crate::AppState;

/// Response for risk endpoint
#[derive(Debug, Serialize)]
pub struct RiskResponse {
    pub assessment: RiskAssessment,
    pub any_risk: bool,
    pub critical: bool,
    /// Frames processed during the last sampling period
    pub frame_rate: u64,
    pub pipeline: StatsSnapshot,
    pub alerts: AlertStatus,
}

#[derive(Debug, Serialize)]
pub struct AlertStatus {
    pub speaking: bool,
    pub pending: usize,
    #[serde(flatten)]
    pub counters: ArbiterStats,
}

/// Get the latest risk assessment
pub async fn get_risk(State(state): State<Arc<AppState>>) -> Json<RiskResponse> {
    let coordinator = &state.coordinator;
    let assessment = coordinator.risk().get();
    let arbiter = coordinator.arbiter();

    Json(RiskResponse {
        any_risk: assessment.any_risk(),
        critical: assessment.is_critical(),
        assessment,
        frame_rate: coordinator.frame_rate().get(),
        pipeline: coordinator.stats(),
        alerts: AlertStatus {
            speaking: arbiter.is_speaking(),
            pending: arbiter.pending_len(),
            counters: coordinator.alert_stats(),
        },
    })
}
