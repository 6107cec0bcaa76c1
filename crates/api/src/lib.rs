//! Vehicle Safety Guardian API Server
//!
//! HTTP host surface for the sensor fusion pipeline: camera frames,
//! positioning and sign updates in, risk assessment out.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use event_fusion::{Collaborators, FusionError, SensorFusionCoordinator};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod routes;
mod settings;
mod speech;

pub use settings::Settings;
pub use speech::TracingSpeechEngine;

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Pipeline is shut down")]
    ShutDown,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FusionError> for ApiError {
    fn from(e: FusionError) -> Self {
        match e {
            FusionError::ShutDown => ApiError::ShutDown,
            FusionError::Capture(e) => ApiError::BadRequest(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub coordinator: SensorFusionCoordinator,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Start the pipeline with unloaded perception models and the logging
    /// speech engine. Must be called from within a tokio runtime.
    pub fn new(settings: &Settings) -> Result<Self, FusionError> {
        let (sink, events) = alerting::speech_channel();
        let engine = Arc::new(TracingSpeechEngine::new(
            sink,
            tokio::runtime::Handle::current(),
            settings.speech_ms_per_char,
        ));
        let coordinator = SensorFusionCoordinator::spawn(
            settings.fusion.clone(),
            Collaborators::unloaded(),
            engine,
            events,
        )?;

        Ok(Self {
            coordinator,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        })
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/risk", get(routes::risk::get_risk))
        .route("/api/v1/location", post(routes::sensors::post_location))
        .route("/api/v1/sign", post(routes::sensors::post_sign))
        .route("/api/v1/frames", post(routes::frames::post_frame))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let (status, code) = if state.coordinator.is_shut_down() {
        ("shutting_down", StatusCode::SERVICE_UNAVAILABLE)
    } else {
        ("healthy", StatusCode::OK)
    };

    let response = HealthResponse {
        status: status.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    (code, Json(response))
}

/// Initialize logging at `level` (trace, debug, info, warn, error)
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let level = Level::from_str(level)
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", level))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;
    Ok(())
}

/// Run the server until `shutdown` resolves, then stop the pipeline
pub async fn run_server<F>(settings: Settings, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(AppState::new(&settings)?);
    let app = create_router(state.clone());

    info!("Starting API server on {}", settings.listen_addr);

    let listener = tokio::net::TcpListener::bind(&settings.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    // joins the consumer and completion threads
    tokio::task::spawn_blocking(move || state.coordinator.shutdown()).await?;
    info!("API server stopped");

    Ok(())
}
