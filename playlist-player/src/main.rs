//! Playlist Player (playlist-player) - Main entry point
//!
//! Opens the playlist database, starts the playback coordinator and serves
//! the HTTP control interface until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playlist_common::db::init_database;
use playlist_player::api;
use playlist_player::config::{Config, ConfigOverrides};
use playlist_player::{OrderedPlaylist, PlaybackCoordinator};

/// Command-line arguments for playlist-player
#[derive(Parser, Debug)]
#[command(name = "playlist-player")]
#[command(about = "Single-playlist playback coordinator")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PLAYLIST_PORT")]
    port: Option<u16>,

    /// Path to the SQLite database file
    #[arg(short, long, env = "PLAYLIST_DATABASE")]
    database: Option<PathBuf>,

    /// Folder holding the database when --database is not given
    #[arg(long)]
    data_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "PLAYLIST_CONFIG")]
    config: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "PLAYLIST_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let overrides = ConfigOverrides {
        database_path: args.database,
        data_folder: args.data_folder,
        port: args.port,
        log_level: args.log_level,
    };
    let config = Config::load(args.config.as_deref(), overrides)
        .await
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("playlist_player={},tower_http=debug", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Playlist Player on port {}", config.port);
    info!("Database: {}", config.database_path.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let coordinator = PlaybackCoordinator::new(OrderedPlaylist::new(pool), config.timing);
    info!("Playback coordinator initialized");

    let app = api::create_router(api::AppState {
        coordinator: coordinator.clone(),
    });

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Err(e) = coordinator.shutdown().await {
        warn!("Playback coordinator did not stop cleanly: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
