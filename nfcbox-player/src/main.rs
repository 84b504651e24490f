//! nfcbox-player - NFC music box runtime
//!
//! `run` (default) polls the tag reader and transport buttons and drives the
//! playback backend until SIGINT/SIGTERM. `authorize` performs the one-time
//! interactive grant that fills the token cache.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nfcbox_common::config::{Config, Credentials};
use nfcbox_common::db::init_database;
use nfcbox_player::backend::spotify::build_http_client;
use nfcbox_player::backend::{SpotifyAuth, SpotifyClient};
use nfcbox_player::hardware::ConsoleInput;
use nfcbox_player::resolver::RegistryResolver;
use nfcbox_player::sampler::InputSampler;
use nfcbox_player::{ControlLoop, PlaybackController};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "nfcbox-player", version, about = "NFC tag driven music box")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "NFCBOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the control loop (default)
    Run,
    /// Grant access to the playback account and write the token cache
    Authorize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nfcbox_player=info,nfcbox_common=info".into()),
        )
        .init();

    info!(
        "Starting nfcbox-player v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let credentials = match config.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let http = build_http_client()?;
    let auth = SpotifyAuth::new(
        http.clone(),
        &credentials,
        &config.backend,
        config.token_cache_path.clone(),
    );

    match args.command.unwrap_or(Command::Run) {
        Command::Authorize => authorize(&auth).await,
        Command::Run => run(config, credentials, http, auth).await,
    }
}

async fn authorize(auth: &SpotifyAuth) -> Result<()> {
    println!("Open this URL in a browser and grant access:\n\n  {}\n", auth.authorize_url()?);
    println!("Paste the URL you were redirected to:");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let redirected = lines
        .next_line()
        .await?
        .context("No redirect URL entered")?;

    auth.exchange_code(&redirected).await?;
    info!("✓ Authorization complete");
    Ok(())
}

async fn run(
    config: Config,
    credentials: Credentials,
    http: reqwest::Client,
    auth: SpotifyAuth,
) -> Result<()> {
    if let Err(e) = auth.initialize().await {
        error!("{}", e);
        error!(
            "Run `nfcbox-player authorize` to (re)create the token cache at {}",
            auth.cache_path().display()
        );
        return Err(e.into());
    }
    info!("✓ Authenticated with playback backend");

    info!("Tag registry: {}", config.database_path.display());
    let pool = init_database(&config.database_path).await?;
    let resolver = RegistryResolver::new(pool);

    // Bench driver; a GPIO/MFRC522 build provides its own InputHardware
    warn!("Using console input driver (commands: tag <id>, remove, play, next, prev)");
    let hardware = ConsoleInput::new(config.pins, config.timing.read_timeout);
    let sampler = InputSampler::new(hardware, &config.pins);
    for binding in sampler.bindings() {
        info!(pin = binding.pin, "{} button", binding.button.label());
    }

    let backend = SpotifyClient::new(http, config.backend.api_base_url.clone(), auth);
    let controller = PlaybackController::new(backend, credentials.device_id, config.timing.settle);

    let control_loop = ControlLoop::new(sampler, resolver, controller, config.timing);
    let session = control_loop.run(shutdown_signal()).await;

    info!(
        last_tag = session.last_tag_identifier.as_deref().unwrap_or("-"),
        "Shutdown complete"
    );
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
