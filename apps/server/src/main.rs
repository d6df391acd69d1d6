//! Ripcast Server - standalone broadcast streaming daemon.
//!
//! Serves a directory of pre-encoded `.rip` tracks to every connected
//! client in lockstep over TCP: one shared playback cursor, one chunk of
//! audio per second, metadata frames at every track boundary. Designed to
//! run headless as a background daemon.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ripcast_core::{bind_listener, Engine, EngineConfig, Playlist};
use tokio::signal;

use crate::config::ServerConfig;

/// Ripcast Server - lockstep playlist broadcaster.
#[derive(Parser, Debug)]
#[command(name = "ripcast-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TCP port to listen on (required here or in the config file).
    port: Option<u16>,

    /// Directory holding the `.rip` playlist (required here or in the
    /// config file).
    playlist: Option<PathBuf>,

    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "RIPCAST_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Maximum simultaneously connected clients (overrides config file).
    #[arg(short = 'm', long, env = "RIPCAST_MAX_CLIENTS")]
    max_clients: Option<usize>,
}

// The engine is single-threaded: one readiness loop schedules the listener,
// the tick timer and every client socket.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Ripcast Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(playlist) = args.playlist {
        config.playlist = Some(playlist);
    }
    if let Some(max_clients) = args.max_clients {
        config.max_clients = max_clients;
    }

    let port = config
        .port
        .context("usage: ripcast-server <port> <playlist>")?;
    let playlist_dir = config
        .playlist
        .context("usage: ripcast-server <port> <playlist>")?;

    log::info!(
        "Configuration: port={}, playlist={}, max_clients={}",
        port,
        playlist_dir.display(),
        config.max_clients
    );

    let playlist = Playlist::scan(&playlist_dir).context("Failed to load playlist")?;
    let listener = bind_listener(port).with_context(|| format!("Failed to bind port {port}"))?;
    let engine = Engine::new(
        listener,
        playlist,
        EngineConfig {
            max_clients: config.max_clients,
            ..EngineConfig::default()
        },
    )
    .context("Failed to load the first track")?;

    engine
        .run(shutdown_signal())
        .await
        .context("Engine failed")?;

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
