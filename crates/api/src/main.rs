//! Vehicle Safety Guardian - Main Entry Point

use api::{init_logging, run_server, Settings};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(&settings.log_level)?;

    info!("=== Vehicle Safety Guardian v{} ===", env!("CARGO_PKG_VERSION"));

    run_server(settings, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    })
    .await
}
