mod routes;
mod settings;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use timeline_sync_core::{KvStore, MemoryStore, SledStore};

use crate::settings::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load()?;

    // STORAGE_PATH selects the durable backend; without it, board state
    // lives in memory for the lifetime of the process.
    let storage: Arc<dyn KvStore> = match &settings.storage_path {
        Some(path) => Arc::new(SledStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };

    let port = settings.port;
    info!("sync mode: {:?}", settings.sync_mode);

    let state = AppState::new(storage, settings);
    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("monday-timeline-sync listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
