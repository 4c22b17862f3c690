use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roomgate::{build_router, config::Config, AppState};

// ─── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything else so ROOMGATE_LOG_LEVEL is available.
    let _ = dotenvy::dotenv();

    let log_level = std::env::var("ROOMGATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    let cfg = Config::from_env();
    let bind_addr = cfg.bind_addr.clone();

    let state = Arc::new(AppState { config: cfg });
    let app = build_router(state);

    info!("roomgate listening on http://{bind_addr}");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
