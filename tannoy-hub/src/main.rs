//! Catalog hub (tannoy-hub) - Main entry point
//!
//! Serves the catalog API, stores uploaded audio, and fans change
//! notifications out to the configured playback nodes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tannoy_common::catalog::{AudioStore, JsonStore};
use tannoy_common::config::{load_config, HubConfig, StorageLayout};
use tannoy_hub::api;
use tannoy_hub::fanout::Fanout;

/// Command-line arguments for tannoy-hub
#[derive(Parser, Debug)]
#[command(name = "tannoy-hub")]
#[command(about = "Catalog hub for the Tannoy announcement system")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "TANNOY_HUB_PORT")]
    port: Option<u16>,

    /// Root folder for the catalog and audio stores
    #[arg(short, long, env = "TANNOY_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Receiver webhook endpoint; repeat for multiple nodes
    #[arg(long = "receiver")]
    receivers: Vec<String>,

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
                .unwrap_or_else(|_| "tannoy_hub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config: HubConfig =
        load_config(args.config.as_deref(), "hub.toml").context("Failed to load config")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(root) = args.root_folder {
        config.root_folder = root;
    }
    if !args.receivers.is_empty() {
        config.receivers = args.receivers;
    }

    info!("Starting Tannoy hub on port {}", config.port);
    info!("Root folder: {}", config.root_folder.display());
    if config.receivers.is_empty() {
        warn!("No receivers configured; notifications will not be delivered");
    } else {
        info!("Receivers: {}", config.receivers.join(", "));
    }

    let layout = StorageLayout::new(&config.root_folder);
    let songs = JsonStore::open(layout.songs_dir())
        .await
        .context("Failed to open song store")?;
    let events = JsonStore::open(layout.events_dir())
        .await
        .context("Failed to open event store")?;
    let audio = AudioStore::open(layout.songs_dir())
        .await
        .context("Failed to open audio store")?;
    let panic = AudioStore::open(layout.panic_dir())
        .await
        .context("Failed to open panic store")?;

    let fanout = Arc::new(
        Fanout::new(
            config.receivers.clone(),
            Duration::from_secs(config.fanout_timeout_secs),
        )
        .context("Failed to build fanout client")?,
    );

    let app_state = api::AppState {
        songs,
        events,
        audio,
        panic,
        fanout,
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
