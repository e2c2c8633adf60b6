use std::time::Duration;

use anyhow::{Context, Result};
use grantd_server::{AppState, build_router, telemetry};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let config = telemetry::load_config()?;
    telemetry::init_tracing(&config);

    let state = AppState::from_config(&config).await?;

    let issuer = state.issuer.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = issuer.purge_expired().await;
            if purged > 0 {
                debug!(purged, "expired sessions purged");
            }
        }
    });

    let app = build_router(state);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("grantd listening on http://{}", addr);
    info!("Token endpoint: POST http://{}/oauth/token", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
