//! binli HTTP server.
//!
//! ```bash
//! BINLI_PORT=8080 RUST_LOG=binli_core=debug,info cargo run --bin binli-server
//! ```

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use binli_server::{AppState, ServerConfig, create_router};
use binli_store_memory::MemoryBinStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = ServerConfig::from_env()?;

    // One store handle serves as both the persistence and the notification collaborator.
    let store = Arc::new(MemoryBinStore::new(config.feed_capacity));
    let state = AppState::new(Arc::<MemoryBinStore>::clone(&store), store);
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "binli server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("binli server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
    }
}
