//! REST API implementation for the catalog hub
//!
//! Routes mirror the wire contract the playback nodes expect: a full
//! catalog dump for syncing, multipart song upsert and panic upload, and
//! validated event CRUD. Every mutation fans a notification out to the
//! configured receivers in the background.

pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use tannoy_common::catalog::{AudioStore, JsonStore};
use tannoy_common::model::{Event, Song};
use tannoy_common::Error;

use crate::fanout::Fanout;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub songs: JsonStore<Song>,
    pub events: JsonStore<Event>,
    /// Uploaded song audio
    pub audio: AudioStore,
    /// Panic recordings awaiting node pickup
    pub panic: AudioStore,
    pub fanout: Arc<Fanout>,
    /// Root folder path
    pub root_folder: String,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/data", get(handlers::get_data))
        .route("/api/songs", post(handlers::upsert_song))
        .route("/api/song/:id", delete(handlers::delete_song))
        .route("/api/song_file/:filename", get(handlers::get_song_file))
        .route("/api/panic", post(handlers::upload_panic))
        .route("/api/event", post(handlers::create_event))
        .route("/api/event/:id", put(handlers::update_event))
        .route("/api/event/:id", delete(handlers::delete_event))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "tannoy-hub",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
        "root_folder": state.root_folder,
        "receivers": state.fanout.receivers().len()
    }))
}

/// Error wrapper mapping the common taxonomy onto response codes.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
