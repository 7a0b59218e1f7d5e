//! Integration tests for the node webhook endpoint
//!
//! A real in-test hub (axum on an ephemeral port) serves the catalog and
//! audio bytes, and the node router is driven with `oneshot` requests,
//! so sync and panic staging run over actual sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Path as AxumPath,
    http::{header, Request, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use tannoy_common::catalog::JsonStore;
use tannoy_node::api::{create_router, AppState};
use tannoy_node::sync::{HubClient, Syncer};

/// Spawn a fake hub serving a one-song catalog and fixed audio bytes.
async fn spawn_hub() -> SocketAddr {
    async fn data() -> Json<Value> {
        Json(json!({
            "songs": [
                { "id": "s1", "name": "Bell", "filename": "bell.mp3",
                  "url": "/api/song_file/bell.mp3" }
            ],
            "events": [
                { "id": "e1", "name": "Morning", "day": "monday",
                  "time": "08:00", "songId": "s1" }
            ]
        }))
    }

    async fn song_file(AxumPath(filename): AxumPath<String>) -> (StatusCode, Vec<u8>) {
        match filename.as_str() {
            "bell.mp3" => (StatusCode::OK, b"ID3bell".to_vec()),
            "siren.wav" => (StatusCode::OK, b"RIFFsiren".to_vec()),
            _ => (StatusCode::NOT_FOUND, Vec::new()),
        }
    }

    let app = Router::new()
        .route("/api/data", get(data))
        .route("/api/song_file/:filename", get(song_file));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn setup_state(dir: &TempDir, hub: SocketAddr) -> AppState {
    let client = HubClient::new(format!("http://{}", hub), Duration::from_secs(2)).unwrap();
    let songs = JsonStore::open(dir.path().join("songs")).await.unwrap();
    let events = JsonStore::open(dir.path().join("events")).await.unwrap();
    AppState {
        syncer: Arc::new(Syncer::new(
            client,
            songs,
            events,
            dir.path().join("songs"),
            dir.path().join("panic"),
        )),
        root_folder: dir.path().to_string_lossy().to_string(),
        port: 0,
    }
}

fn webhook(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/webhook_receive")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_module() {
    let dir = TempDir::new().unwrap();
    let hub = spawn_hub().await;
    let app = create_router(setup_state(&dir, hub).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn panic_alert_stages_the_recording() {
    let dir = TempDir::new().unwrap();
    let hub = spawn_hub().await;
    let state = setup_state(&dir, hub).await;
    let app = create_router(state);

    let response = app
        .oneshot(webhook(r#"{"type":"panic_alert","filename":"siren.wav"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let staged = dir.path().join("panic").join("siren.wav");
    assert_eq!(std::fs::read(&staged).unwrap(), b"RIFFsiren");
    // The atomic write leaves no temp file behind
    assert!(!dir.path().join("panic").join("siren.wav.tmp").exists());
}

#[tokio::test]
async fn panic_alert_for_unknown_recording_is_a_gateway_error() {
    let dir = TempDir::new().unwrap();
    let hub = spawn_hub().await;
    let app = create_router(setup_state(&dir, hub).await);

    let response = app
        .oneshot(webhook(r#"{"type":"panic_alert","filename":"ghost.wav"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn panic_alert_with_path_escape_is_rejected() {
    let dir = TempDir::new().unwrap();
    let hub = spawn_hub().await;
    let app = create_router(setup_state(&dir, hub).await);

    let response = app
        .oneshot(webhook(r#"{"type":"panic_alert","filename":"../../etc/passwd"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let dir = TempDir::new().unwrap();
    let hub = spawn_hub().await;
    let app = create_router(setup_state(&dir, hub).await);

    let response = app
        .clone()
        .oneshot(webhook("{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(webhook(r#"{"type":"reboot"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn songs_update_triggers_a_catalog_sync() {
    let dir = TempDir::new().unwrap();
    let hub = spawn_hub().await;
    let state = setup_state(&dir, hub).await;
    let syncer = state.syncer.clone();
    let app = create_router(state);

    let response = app
        .oneshot(webhook(r#"{"type":"songs_update","songId":"s1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Sync runs in the background; wait for the mirrored record and audio
    let songs = JsonStore::open(dir.path().join("songs")).await.unwrap();
    let audio_path = dir.path().join("songs").join("bell.mp3");
    for _ in 0..50 {
        let synced: Vec<tannoy_common::model::Song> = songs.list().await.unwrap();
        if !synced.is_empty() && audio_path.is_file() {
            assert_eq!(synced[0].id, "s1");
            assert_eq!(std::fs::read(&audio_path).unwrap(), b"ID3bell");
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("catalog sync did not complete (hub {})", syncer.hub().base());
}

#[tokio::test]
async fn direct_sync_mirrors_records_and_drops_stale_ones() {
    let dir = TempDir::new().unwrap();
    let hub = spawn_hub().await;
    let state = setup_state(&dir, hub).await;

    // A record the hub no longer knows about
    let events = JsonStore::open(dir.path().join("events")).await.unwrap();
    events
        .upsert(tannoy_common::model::Event {
            id: "stale".to_string(),
            name: "Old bell".to_string(),
            day: tannoy_common::model::DayOfWeek::Friday,
            time: "10:30".parse().unwrap(),
            song_id: "s1".to_string(),
        })
        .await
        .unwrap();

    state.syncer.sync_catalog().await.unwrap();

    let synced = events.map_by_id().await.unwrap();
    assert!(synced.contains_key("e1"));
    assert!(!synced.contains_key("stale"));
}
