//! Playback Node (tannoy-node) library
//!
//! A node keeps a synced copy of the hub's catalog, receives webhook
//! notifications, and drives local audio playback: scheduled events on
//! their weekly slots and panic recordings as soon as they arrive.

pub mod api;
pub mod matcher;
pub mod panic;
pub mod player;
pub mod scheduler;
pub mod sync;
