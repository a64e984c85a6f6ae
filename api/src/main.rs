use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

mod handlers;
mod middleware;
mod routes;
mod state;

use common::bootstrap;
use common::config::Service;
use common::db::repositories::RotationStore;
use common::telemetry;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = bootstrap::load_settings(Service::Api)?;
    bootstrap::init_telemetry(&config)?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        environment = ?config.environment,
        "Starting API server"
    );

    let db_pool = bootstrap::init_database_pool(&config).await?;
    let store: Arc<dyn RotationStore> = Arc::new(bootstrap::init_rotation_repository(
        &config,
        db_pool.clone(),
    ));

    let metrics_handle = telemetry::install_metrics_recorder()?;
    tracing::info!("Metrics recorder installed");

    let state = AppState::new(store, config.clone(), metrics_handle);
    let app = routes::create_router(state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    tracing::info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    telemetry::shutdown_tracer();

    tracing::info!("API server stopped");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Initiating graceful shutdown");
}
