//! # Storefront API
//!
//! HTTP server for the storefront catalog, carts and orders.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront API Server                            │
//! │                                                                         │
//! │  Browser / app ───► HTTP (8080) ───► Handlers ───► PostgreSQL          │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                   /static (images)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use storefront_api::config::ApiConfig;
use storefront_api::{router, AppState};
use storefront_db::{Database, DbConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storefront_api=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting storefront API server...");

    // Load configuration
    let config = ApiConfig::load().context("loading configuration")?;
    info!(
        port = config.http_port,
        db_url = %config.database_url.chars().take(30).collect::<String>(),
        static_dir = %config.static_dir.display(),
        "Configuration loaded"
    );

    // Connect to database (runs migrations when enabled)
    let db_config = DbConfig::new(config.database_url.clone())
        .max_connections(config.max_connections)
        .run_migrations(config.run_migrations);
    let db = Database::new(db_config)
        .await
        .context("connecting to PostgreSQL")?;
    info!("Connected to PostgreSQL");

    tokio::fs::create_dir_all(&config.static_dir)
        .await
        .with_context(|| format!("creating {}", config.static_dir.display()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(db.clone(), config);
    let app = router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
