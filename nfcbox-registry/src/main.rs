//! nfcbox-registry - tag registry service
//!
//! Serves the tag registry over HTTP so tags can be assigned from a browser
//! while the player keeps reading the same database.

use anyhow::{Context, Result};
use clap::Parser;
use nfcbox_common::config::Config;
use nfcbox_common::db::init_database;
use nfcbox_registry::{build_router, AppState};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "nfcbox-registry", version, about = "NFC tag registry service")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "NFCBOX_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nfcbox_registry=info,tower_http=debug".into()),
        )
        .init();

    info!(
        "Starting nfcbox-registry v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    info!("Database path: {}", config.database_path.display());
    let pool = match init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Tag registry ready");
            pool
        }
        Err(e) => {
            error!("Failed to open tag registry: {}", e);
            return Err(e.into());
        }
    };

    let app = build_router(AppState::new(pool));

    let listener = tokio::net::TcpListener::bind(&config.registry_bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.registry_bind_addr))?;
    info!("nfcbox-registry listening on http://{}", config.registry_bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
