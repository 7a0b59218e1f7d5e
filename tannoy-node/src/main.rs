//! Playback node (tannoy-node) - Main entry point
//!
//! Keeps a synced copy of the hub catalog, listens for webhook
//! notifications, and drives local audio playback through an external
//! player command.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tannoy_common::catalog::JsonStore;
use tannoy_common::config::{load_config, NodeConfig, StorageLayout};
use tannoy_node::panic::{PanicDetector, PlayedLedger};
use tannoy_node::player::Player;
use tannoy_node::scheduler::{Periods, Scheduler};
use tannoy_node::sync::{HubClient, Syncer};
use tannoy_node::api;

/// Command-line arguments for tannoy-node
#[derive(Parser, Debug)]
#[command(name = "tannoy-node")]
#[command(about = "Playback node for the Tannoy announcement system")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "TANNOY_NODE_PORT")]
    port: Option<u16>,

    /// Root folder for the local catalog mirror and panic staging
    #[arg(short, long, env = "TANNOY_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Base URL of the hub to sync from
    #[arg(long, env = "TANNOY_HUB_URL")]
    hub_url: Option<String>,

    /// External player command
    #[arg(long, env = "TANNOY_PLAYER")]
    player: Option<String>,

    /// Config file path (overrides the default search locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tannoy_node=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config: NodeConfig =
        load_config(args.config.as_deref(), "node.toml").context("Failed to load config")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(root) = args.root_folder {
        config.root_folder = root;
    }
    if let Some(hub_url) = args.hub_url {
        config.hub_url = hub_url;
    }
    if let Some(player) = args.player {
        config.player_command = player;
    }

    info!("Starting Tannoy playback node on port {}", config.port);
    info!("Root folder: {}", config.root_folder.display());
    info!("Hub: {}", config.hub_url);

    let layout = StorageLayout::new(&config.root_folder);
    tokio::fs::create_dir_all(layout.panic_dir())
        .await
        .context("Failed to create panic staging directory")?;

    let songs = JsonStore::open(layout.songs_dir())
        .await
        .context("Failed to open song store")?;
    let events = JsonStore::open(layout.events_dir())
        .await
        .context("Failed to open event store")?;

    let hub = HubClient::new(&config.hub_url, Duration::from_secs(30))
        .context("Failed to build hub client")?;
    let syncer = Arc::new(Syncer::new(
        hub,
        songs.clone(),
        events.clone(),
        layout.songs_dir(),
        layout.panic_dir(),
    ));

    // Initial pull so the node is useful before the first notification
    if let Err(e) = syncer.sync_catalog().await {
        warn!("Initial catalog sync failed (will retry on notification): {}", e);
    }

    let player = Player::new(&config.player_command);
    let detector = PanicDetector::new(
        layout.panic_dir(),
        PlayedLedger::new(layout.ledger_path()),
        player.clone(),
    );
    let scheduler = Scheduler::new(
        songs,
        events,
        layout.songs_dir(),
        detector,
        player,
        Periods::from_secs(config.tick_secs, config.panic_pass_secs, config.event_pass_secs),
    );
    tokio::spawn(scheduler.run());

    let app_state = api::AppState {
        syncer,
        root_folder: config.root_folder.to_string_lossy().to_string(),
        port: config.port,
    };
    let app = api::create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
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
