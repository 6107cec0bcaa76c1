//! Frame Routes

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use frame_buffer::Offer;
use serde::Serialize;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct FrameAccepted {
    /// True when the oldest buffered frame was evicted to admit this one
    pub evicted_oldest: bool,
}

/// Decode a JPEG body and offer it to the pipeline
pub async fn post_frame(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<FrameAccepted>), ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty frame".to_string()));
    }

    let offer = tokio::task::spawn_blocking(move || state.coordinator.submit_jpeg(&body))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let evicted_oldest = match offer {
        Offer::Accepted => false,
        Offer::EvictedOldest => true,
        Offer::Closed => return Err(ApiError::ShutDown),
    };
    Ok((StatusCode::ACCEPTED, Json(FrameAccepted { evicted_oldest })))
}
