//! REST API for the playback node
//!
//! The node exposes only a health check and the webhook endpoint the hub
//! delivers notifications to. Catalog sync runs in the background so the
//! hub's fanout never waits on a full pull; panic staging is awaited so
//! the hub learns whether the recording actually landed.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use tannoy_common::notify::Notification;
use tannoy_common::Error;

use crate::sync::Syncer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub syncer: Arc<Syncer>,
    /// Root folder path
    pub root_folder: String,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/webhook_receive", post(webhook_receive))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "tannoy-node",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
        "root_folder": state.root_folder
    }))
}

/// Webhook endpoint the hub fans notifications out to.
async fn webhook_receive(
    State(state): State<AppState>,
    Json(note): Json<Notification>,
) -> (StatusCode, Json<serde_json::Value>) {
    info!("Webhook received: {}", note.kind());

    match note {
        Notification::SongsUpdate { .. } | Notification::EventsUpdate { .. } => {
            // Re-sync in the background; the hub only needs the ack
            let syncer = state.syncer.clone();
            tokio::spawn(async move {
                if let Err(e) = syncer.sync_catalog().await {
                    error!("Catalog sync failed: {}", e);
                }
            });
            (StatusCode::OK, Json(json!({ "status": "syncing" })))
        }
        Notification::PanicAlert { filename } => {
            match state.syncer.stash_panic(&filename).await {
                Ok(path) => (
                    StatusCode::OK,
                    Json(json!({ "status": "staged", "path": path.display().to_string() })),
                ),
                Err(Error::InvalidInput(msg)) => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": msg })),
                ),
                Err(e) => {
                    error!("Could not stage panic recording {}: {}", filename, e);
                    (
                        StatusCode::BAD_GATEWAY,
                        Json(json!({ "error": e.to_string() })),
                    )
                }
            }
        }
    }
}
