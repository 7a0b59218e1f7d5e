//! Background scheduling loop
//!
//! A single task drives both periodic jobs off one base tick: the panic
//! pass (fast, default 5 s) and the event pass (slow, default 60 s).
//! Keeping them on one loop means a long blocking panic playback
//! naturally delays the event pass instead of racing it for the audio
//! device. Job failures are logged and never terminate the loop.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{info, warn};

use tannoy_common::catalog::JsonStore;
use tannoy_common::model::{Event, Song};
use tannoy_common::time as clock;

use crate::matcher::find_due_events;
use crate::panic::PanicDetector;
use crate::player::Player;

/// Periods for the scheduling loop.
#[derive(Debug, Clone, Copy)]
pub struct Periods {
    pub tick: Duration,
    pub panic_pass: Duration,
    pub event_pass: Duration,
}

impl Periods {
    pub fn from_secs(tick: u64, panic_pass: u64, event_pass: u64) -> Self {
        Self {
            tick: Duration::from_secs(tick.max(1)),
            panic_pass: Duration::from_secs(panic_pass.max(1)),
            event_pass: Duration::from_secs(event_pass.max(1)),
        }
    }
}

/// Drives the panic detector and the due-event matcher.
pub struct Scheduler {
    songs: JsonStore<Song>,
    events: JsonStore<Event>,
    audio_dir: std::path::PathBuf,
    panic: PanicDetector,
    player: Player,
    periods: Periods,
}

impl Scheduler {
    pub fn new(
        songs: JsonStore<Song>,
        events: JsonStore<Event>,
        audio_dir: impl Into<std::path::PathBuf>,
        panic: PanicDetector,
        player: Player,
        periods: Periods,
    ) -> Self {
        Self {
            songs,
            events,
            audio_dir: audio_dir.into(),
            panic,
            player,
            periods,
        }
    }

    /// Run forever. Each tick fires whichever jobs are due; the panic
    /// pass always runs before the event pass on a shared tick so alerts
    /// preempt routine bells.
    pub async fn run(self) {
        let mut interval = time::interval(self.periods.tick);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        let mut panic_due = Instant::now();
        let mut event_due = Instant::now();

        info!(
            "Scheduler started (tick {:?}, panic pass {:?}, event pass {:?})",
            self.periods.tick, self.periods.panic_pass, self.periods.event_pass
        );

        loop {
            interval.tick().await;
            let now = Instant::now();

            if now >= panic_due {
                panic_due = now + self.periods.panic_pass;
                if let Err(e) = self.panic.run_pass().await {
                    warn!("Panic pass failed: {}", e);
                }
            }

            if now >= event_due {
                event_due = now + self.periods.event_pass;
                if let Err(e) = self.run_event_pass().await {
                    warn!("Event pass failed: {}", e);
                }
            }
        }
    }

    /// One event pass: load the catalog, match against the current
    /// minute, start playback for every due event.
    async fn run_event_pass(&self) -> tannoy_common::Result<()> {
        let events = self.events.list().await?;
        if events.is_empty() {
            return Ok(());
        }
        let songs: HashMap<String, Song> = self.songs.map_by_id().await?;

        let now = clock::now();
        let due = find_due_events(now, &events, &songs, &self.audio_dir);
        for due_event in due {
            info!(
                "Event due: {} ({} {})",
                due_event.event.name, due_event.event.day, due_event.event.time
            );
            // Detached: overlapping bells are the original behavior, and a
            // stuck player must not stall the loop
            if let Err(e) = self.player.spawn_detached(&due_event.audio_path).await {
                warn!(
                    "Could not start playback for event {}: {}",
                    due_event.event.name, e
                );
            }
        }
        Ok(())
    }
}
