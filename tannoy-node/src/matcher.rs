//! Due-event matching
//!
//! Matching is separated from playing: this module only decides which
//! events are due at a given wall-clock instant and resolves each to a
//! playable file, so it is testable without any audio subsystem.
//!
//! An event is due iff its day equals today's symbolic day and its time
//! equals the current minute exactly. There is no range matching: the
//! scheduler drives this at most once per minute, and a missed minute
//! boundary is a permanent miss for that occurrence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::warn;

use tannoy_common::model::{Event, Song};
use tannoy_common::time;

/// A due event resolved to the local file that should be played.
#[derive(Debug, Clone)]
pub struct DueEvent {
    pub event: Event,
    pub audio_path: PathBuf,
}

/// Match `events` against `now`, resolving song references through
/// `songs` and audio files under `audio_dir`.
///
/// Dangling references never fail the pass: an event whose song is
/// missing, has no uploaded audio, or points at a file that is not on
/// disk is logged and skipped, and the remaining events are still
/// considered.
pub fn find_due_events(
    now: DateTime<Local>,
    events: &[Event],
    songs: &HashMap<String, Song>,
    audio_dir: &Path,
) -> Vec<DueEvent> {
    let today = time::day_of(&now);
    let minute = time::minute_of(&now);

    let mut due = Vec::new();
    for event in events {
        if event.day != today || event.time != minute {
            continue;
        }

        let Some(song) = songs.get(&event.song_id) else {
            warn!(
                "Song {} not found for event {}; skipping",
                event.song_id, event.name
            );
            continue;
        };

        let Some(filename) = song.filename.as_deref() else {
            warn!("Song {} has no audio file; skipping event {}", song.name, event.name);
            continue;
        };

        let audio_path = audio_dir.join(filename);
        if !audio_path.is_file() {
            warn!(
                "Audio file {} missing for event {}; skipping",
                audio_path.display(),
                event.name
            );
            continue;
        }

        due.push(DueEvent {
            event: event.clone(),
            audio_path,
        });
    }
    due
}
