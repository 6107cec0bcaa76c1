//! Sensor Routes

use std::sync::Arc;
use std::time::Instant;

use adas::{LocationSample, SignReading};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiError, AppState};

/// Positioning update
#[derive(Debug, Deserialize)]
pub struct LocationUpdate {
    /// Ground speed (m/s)
    pub speed_mps: f32,
}

/// Recognized sign pushed by an external classifier
#[derive(Debug, Deserialize)]
pub struct SignUpdate {
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct LocationAccepted {
    pub speed_kmh: f32,
}

#[derive(Debug, Serialize)]
pub struct SignAccepted {
    pub label: String,
    pub derived_speed_limit: Option<u32>,
}

/// Replace the latest location sample
pub async fn post_location(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LocationUpdate>,
) -> Result<(StatusCode, Json<LocationAccepted>), ApiError> {
    if !update.speed_mps.is_finite() || update.speed_mps < 0.0 {
        return Err(ApiError::BadRequest(format!("invalid speed {}", update.speed_mps)));
    }

    let sample = LocationSample::now(update.speed_mps);
    state.coordinator.submit_location(sample)?;
    debug!("Location update: {:.1} m/s", update.speed_mps);

    Ok((
        StatusCode::ACCEPTED,
        Json(LocationAccepted {
            speed_kmh: sample.speed_kmh(),
        }),
    ))
}

/// Replace the latest sign reading
pub async fn post_sign(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SignUpdate>,
) -> Result<(StatusCode, Json<SignAccepted>), ApiError> {
    if !(0.0..=1.0).contains(&update.confidence) {
        return Err(ApiError::BadRequest(format!(
            "confidence {} outside [0, 1]",
            update.confidence
        )));
    }

    let reading = SignReading::from_label(update.label, update.confidence, Instant::now());
    let accepted = SignAccepted {
        label: reading.label.clone(),
        derived_speed_limit: reading.derived_speed_limit,
    };
    state.coordinator.submit_sign_reading(reading)?;
    debug!("Sign update: {}", accepted.label);

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}
