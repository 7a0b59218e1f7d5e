//! Notification messages fanned out to receiver nodes
//!
//! Wire format matches the webhook contract: a JSON object tagged with
//! `type` and carrying a small camelCase payload. Messages are ephemeral,
//! never persisted, and delivered best-effort.

use serde::{Deserialize, Serialize};

/// A change notification delivered to every configured receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// The song catalog changed (saved or deleted)
    SongsUpdate {
        #[serde(
            rename = "songId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        song_id: Option<String>,
        #[serde(
            rename = "deletedSongId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        deleted_song_id: Option<String>,
    },

    /// The event catalog changed (saved or deleted)
    EventsUpdate {
        #[serde(
            rename = "eventId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        event_id: Option<String>,
        #[serde(
            rename = "deletedEventId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        deleted_event_id: Option<String>,
    },

    /// A panic recording arrived; receivers should pull and stage it
    PanicAlert { filename: String },
}

impl Notification {
    pub fn song_saved(song_id: impl Into<String>) -> Self {
        Notification::SongsUpdate {
            song_id: Some(song_id.into()),
            deleted_song_id: None,
        }
    }

    pub fn song_deleted(song_id: impl Into<String>) -> Self {
        Notification::SongsUpdate {
            song_id: None,
            deleted_song_id: Some(song_id.into()),
        }
    }

    pub fn event_saved(event_id: impl Into<String>) -> Self {
        Notification::EventsUpdate {
            event_id: Some(event_id.into()),
            deleted_event_id: None,
        }
    }

    pub fn event_deleted(event_id: impl Into<String>) -> Self {
        Notification::EventsUpdate {
            event_id: None,
            deleted_event_id: Some(event_id.into()),
        }
    }

    pub fn panic_alert(filename: impl Into<String>) -> Self {
        Notification::PanicAlert {
            filename: filename.into(),
        }
    }

    /// Wire tag, for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::SongsUpdate { .. } => "songs_update",
            Notification::EventsUpdate { .. } => "events_update",
            Notification::PanicAlert { .. } => "panic_alert",
        }
    }
}
