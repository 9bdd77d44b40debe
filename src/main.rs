use std::sync::Arc;

use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

use delivery_hub::api;
use delivery_hub::config::Config;
use delivery_hub::error::AppError;
use delivery_hub::lifecycle::expiry;
use delivery_hub::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let shared_state = Arc::new(AppState::new(config.event_buffer_size));

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(expiry::run_expiry_watchdog(
        shared_state.clone(),
        Duration::from_millis(config.expiry_sweep_interval_ms),
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
