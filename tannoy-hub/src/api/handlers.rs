//! HTTP request handlers
//!
//! Catalog reads, multipart uploads, and event CRUD. Mutation handlers
//! persist first, then spawn the fanout so the response never waits on a
//! slow receiver.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use tannoy_common::model::{Event, Song};
use tannoy_common::notify::Notification;
use tannoy_common::Error;

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub songs: Vec<Song>,
    pub events: Vec<Event>,
}

/// Full catalog dump, the pull side of node sync.
pub async fn get_data(State(state): State<AppState>) -> std::result::Result<Json<DataResponse>, ApiError> {
    let songs = state.songs.list().await?;
    let events = state.events.list().await?;
    Ok(Json(DataResponse { songs, events }))
}

/// Multipart song upsert: a `metadata` JSON part plus an optional `file`
/// audio part. A brand-new song must carry audio; replacing audio drops
/// the previous bytes.
pub async fn upsert_song(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<(StatusCode, Json<Song>), ApiError> {
    let mut song: Option<Song> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("metadata") => {
                let text = field.text().await.map_err(bad_multipart)?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| Error::InvalidInput(format!("bad song metadata: {}", e)))?;
                song = Some(parsed);
            }
            Some("file") => {
                let original = field
                    .file_name()
                    .unwrap_or("upload.mp3")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                upload = Some((original, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let mut song =
        song.ok_or_else(|| Error::InvalidInput("missing metadata part".to_string()))?;
    let is_new = song.id.is_empty();
    if is_new && upload.is_none() {
        return Err(Error::InvalidInput("a new song requires an audio file".to_string()).into());
    }

    let previous = if is_new {
        None
    } else {
        state.songs.get(&song.id).await?
    };

    if let Some((original, bytes)) = upload {
        let stored = state.audio.store(&original, &bytes).await?;
        info!("Stored audio {} ({} bytes)", stored, bytes.len());
        song.filename = Some(stored.clone());
        song.url = Some(format!("/api/song_file/{}", stored));
    } else if song.filename.is_none() {
        // Metadata-only update keeps the existing audio reference
        if let Some(prev) = &previous {
            song.filename = prev.filename.clone();
            song.url = prev.url.clone();
        }
    }

    let stored_song = state.songs.upsert(song).await?;

    // The replaced audio file is unreferenced now
    if let Some(prev_filename) = previous.and_then(|p| p.filename) {
        if stored_song.filename.as_deref() != Some(prev_filename.as_str()) {
            if let Err(e) = state.audio.delete(&prev_filename).await {
                warn!("Could not remove replaced audio {}: {}", prev_filename, e);
            }
        }
    }

    broadcast_in_background(&state, Notification::song_saved(&stored_song.id));
    let status = if is_new { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(stored_song)))
}

/// Delete a song record and its audio bytes.
pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let Some(song) = state.songs.get(&id).await? else {
        return Err(Error::NotFound(format!("no song {}", id)).into());
    };

    if let Some(filename) = &song.filename {
        if let Err(e) = state.audio.delete(filename).await {
            warn!("Could not remove audio {}: {}", filename, e);
        }
    }
    state.songs.delete(&id).await?;
    info!("Deleted song {} ({})", song.name, id);

    broadcast_in_background(&state, Notification::song_deleted(&id));
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

/// Serve stored audio bytes; checks the song store first, then the panic
/// store, so nodes pull both kinds of recording through one route.
pub async fn get_song_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> std::result::Result<Response, ApiError> {
    let bytes = match state.audio.read(&filename).await? {
        Some(bytes) => bytes,
        None => state
            .panic
            .read(&filename)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no audio file {}", filename)))?,
    };
    let headers = [(header::CONTENT_TYPE, content_type_for(&filename))];
    Ok((headers, bytes).into_response())
}

/// Multipart panic upload: store under a fresh name, then alert every
/// receiver immediately.
pub async fn upload_panic(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() == Some("file") {
            let original = field
                .file_name()
                .unwrap_or("panic.mp3")
                .to_string();
            let bytes = field.bytes().await.map_err(bad_multipart)?;
            upload = Some((original, bytes.to_vec()));
        }
    }

    let (original, bytes) =
        upload.ok_or_else(|| Error::InvalidInput("missing file part".to_string()))?;
    let stored = state.panic.store(&original, &bytes).await?;
    info!("Panic recording uploaded: {} ({} bytes)", stored, bytes.len());

    broadcast_in_background(&state, Notification::panic_alert(&stored));
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "staged", "filename": stored })),
    ))
}

/// Create a scheduled event.
pub async fn create_event(
    State(state): State<AppState>,
    Json(event): Json<Event>,
) -> std::result::Result<(StatusCode, Json<Event>), ApiError> {
    let stored = state.events.upsert(event).await?;
    info!("Created event {} ({})", stored.name, stored.id);

    broadcast_in_background(&state, Notification::event_saved(&stored.id));
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Replace an existing event; the path id wins over any id in the body.
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut event): Json<Event>,
) -> std::result::Result<Json<Event>, ApiError> {
    if state.events.get(&id).await?.is_none() {
        return Err(Error::NotFound(format!("no event {}", id)).into());
    }
    event.id = id;
    let stored = state.events.upsert(event).await?;
    info!("Updated event {} ({})", stored.name, stored.id);

    broadcast_in_background(&state, Notification::event_saved(&stored.id));
    Ok(Json(stored))
}

/// Delete a scheduled event.
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    if !state.events.delete(&id).await? {
        return Err(Error::NotFound(format!("no event {}", id)).into());
    }
    info!("Deleted event {}", id);

    broadcast_in_background(&state, Notification::event_deleted(&id));
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

fn broadcast_in_background(state: &AppState, note: Notification) {
    let fanout = state.fanout.clone();
    tokio::spawn(async move {
        fanout.broadcast(&note).await;
    });
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> Error {
    Error::InvalidInput(format!("malformed multipart request: {}", e))
}

fn content_type_for(filename: &str) -> &'static str {
    match std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
    {
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        _ => "audio/mpeg",
    }
}
