//! vitalsync headless client
//!
//! Runs the offline-first tracking client without a UI: loads the
//! persisted device state, then keeps reconciling with the configured
//! remote until interrupted.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitalsync::{AlwaysOnline, ClientConfig, Coordinator, JsonFileBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "vitalsync=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("vitalsync v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();

    let data_path = dirs::data_local_dir()
        .map(|dir| dir.join("vitalsync"))
        .unwrap_or_else(|| std::path::PathBuf::from("./vitalsync_data"))
        .join("store.json");
    tracing::info!(path = %data_path.display(), "device store");

    let backend = Arc::new(JsonFileBackend::new(data_path)?);
    let coordinator = Arc::new(Coordinator::new(backend, Arc::new(AlwaysOnline), config));

    coordinator.load().await?;

    let settings = coordinator.settings().await;
    if settings.api_url.is_none() || settings.api_token.is_none() {
        tracing::warn!("API URL or token not configured; running offline until set");
    }

    let sync_handle = coordinator.clone().sync_continuously();

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down...");
    sync_handle.abort();

    let status = coordinator.sync_status().await;
    tracing::info!(%status, "vitalsync stopped");
    Ok(())
}
