//! Fanout delivery tests against real in-test HTTP receivers
//!
//! Each test stands up one or more real axum listeners on ephemeral
//! ports, so delivery, timeout, and partial-failure behavior are
//! exercised over actual sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tokio::sync::Mutex;

use tannoy_common::notify::Notification;
use tannoy_hub::fanout::Fanout;

type Inbox = Arc<Mutex<Vec<Notification>>>;

/// Spawn a receiver that records every notification it gets.
async fn spawn_receiver(inbox: Inbox) -> SocketAddr {
    async fn receive(State(inbox): State<Inbox>, Json(note): Json<Notification>) -> StatusCode {
        inbox.lock().await.push(note);
        StatusCode::OK
    }

    let app = Router::new()
        .route("/api/webhook_receive", post(receive))
        .with_state(inbox);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Spawn a receiver that never answers within the fanout timeout.
async fn spawn_hanging_receiver() -> SocketAddr {
    async fn hang() -> StatusCode {
        tokio::time::sleep(Duration::from_secs(30)).await;
        StatusCode::OK
    }

    let app = Router::new().route("/api/webhook_receive", post(hang));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn endpoint(addr: SocketAddr) -> String {
    format!("http://{}/api/webhook_receive", addr)
}

#[tokio::test]
async fn delivers_to_every_receiver() {
    let inbox_a: Inbox = Arc::new(Mutex::new(Vec::new()));
    let inbox_b: Inbox = Arc::new(Mutex::new(Vec::new()));
    let addr_a = spawn_receiver(inbox_a.clone()).await;
    let addr_b = spawn_receiver(inbox_b.clone()).await;

    let fanout = Fanout::new(
        vec![endpoint(addr_a), endpoint(addr_b)],
        Duration::from_secs(2),
    )
    .unwrap();

    let note = Notification::panic_alert("siren.wav");
    let outcomes = fanout.broadcast(&note).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|d| d.is_ok()));
    assert_eq!(inbox_a.lock().await.as_slice(), &[note.clone()]);
    assert_eq!(inbox_b.lock().await.as_slice(), &[note]);
}

#[tokio::test]
async fn dead_receiver_does_not_block_the_live_one() {
    let inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
    let live = spawn_receiver(inbox.clone()).await;
    // Nothing listens on this port
    let dead = "http://127.0.0.1:1/api/webhook_receive".to_string();

    let fanout = Fanout::new(vec![dead.clone(), endpoint(live)], Duration::from_secs(2)).unwrap();
    let outcomes = fanout.broadcast(&Notification::song_saved("s1")).await;

    assert_eq!(outcomes.len(), 2);
    let dead_outcome = outcomes.iter().find(|d| d.endpoint == dead).unwrap();
    assert!(!dead_outcome.is_ok());
    let live_outcome = outcomes.iter().find(|d| d.endpoint != dead).unwrap();
    assert!(live_outcome.is_ok());
    assert_eq!(inbox.lock().await.len(), 1);
}

#[tokio::test]
async fn hanging_receiver_is_cut_off_by_the_timeout() {
    let inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
    let live = spawn_receiver(inbox.clone()).await;
    let hanging = spawn_hanging_receiver().await;

    let fanout = Fanout::new(
        vec![endpoint(hanging), endpoint(live)],
        Duration::from_millis(500),
    )
    .unwrap();

    let started = std::time::Instant::now();
    let outcomes = fanout.broadcast(&Notification::event_saved("e1")).await;
    // Concurrent delivery: total time is bounded by one timeout, not the sum
    assert!(started.elapsed() < Duration::from_secs(5));

    let delivered = outcomes.iter().filter(|d| d.is_ok()).count();
    assert_eq!(delivered, 1);
    assert_eq!(inbox.lock().await.len(), 1);
}

#[tokio::test]
async fn no_receivers_is_a_quiet_no_op() {
    let fanout = Fanout::new(Vec::new(), Duration::from_secs(1)).unwrap();
    let outcomes = fanout.broadcast(&Notification::song_deleted("s1")).await;
    assert!(outcomes.is_empty());
}
