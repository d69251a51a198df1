//! Demo server: loads schema declarations and serves their generated REST surface.
//!
//! Run from repo root: `cargo run --example server`
//! Declarations default to `demos/schemas`; set `SCHEMAREST_DATA_DIR` to keep data across restarts.

use schemarest::{
    build_registry, load_schema_defs, AppState, FileStore, MemoryStore, ServiceConfig, StorageBackend,
};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("schemarest=info,server=info")),
        )
        .init();

    let config = ServiceConfig::from_lookup(|key| {
        std::env::var(key)
            .ok()
            .or_else(|| (key == "SCHEMAREST_SCHEMAS").then(|| "demos/schemas".to_string()))
    })?;
    let defs = load_schema_defs(&config.schema_path).await?;
    let registry = build_registry(defs)?;

    let store: Arc<dyn StorageBackend> = match &config.data_dir {
        Some(dir) => Arc::new(FileStore::open(dir).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let state = AppState::new(registry, store.clone())
        .with_prefix(config.prefix.clone())
        .with_page_size(config.page_size);
    let app = schemarest::app(state, config.body_limit);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        "listening on http://{} (API description at {}openapi.json)",
        listener.local_addr()?,
        config.prefix
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.flush().await?;
    Ok(())
}
