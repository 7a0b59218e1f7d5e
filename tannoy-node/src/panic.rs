//! Panic recording detection and consumption
//!
//! The staging directory is the queue: a file's presence means "not yet
//! played", deletion means "handled". Each pass enumerates the staging
//! area, plays new recordings one at a time (blocking, so no two panic
//! recordings ever overlap), and deletes each on success. Files that
//! fail to play stay in place for the next pass.

use std::collections::HashSet;
use std::path::PathBuf;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use tannoy_common::{Error, Result};

use crate::player::Player;

/// Durable set of filenames already handled.
///
/// Consumed recordings are deleted rather than recorded, so the ledger
/// only carries the rare case of a recording that played but could not
/// be removed; those must never be replayed.
#[derive(Debug, Clone)]
pub struct PlayedLedger {
    path: PathBuf,
}

impl PlayedLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the set of handled filenames; a missing ledger file is an
    /// empty set.
    pub async fn load(&self) -> Result<HashSet<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Append one handled filename.
    pub async fn record(&self, filename: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", filename).as_bytes()).await?;
        Ok(())
    }
}

/// Scans the panic staging directory and consumes pending recordings.
#[derive(Debug, Clone)]
pub struct PanicDetector {
    staging: PathBuf,
    ledger: PlayedLedger,
    player: Player,
}

impl PanicDetector {
    pub fn new(staging: impl Into<PathBuf>, ledger: PlayedLedger, player: Player) -> Self {
        Self {
            staging: staging.into(),
            ledger,
            player,
        }
    }

    /// One full pass: enumerate, order, play, consume.
    ///
    /// Returns the filenames consumed this pass, in play order. A pass
    /// with nothing new is a no-op. If the player command is missing the
    /// pass aborts and every remaining file stays in staging.
    pub async fn run_pass(&self) -> Result<Vec<String>> {
        let handled = self.ledger.load().await?;

        let mut pending = Vec::new();
        let mut entries = fs::read_dir(&self.staging).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_control_file(&name) || handled.contains(&name) {
                continue;
            }
            pending.push(name);
        }

        if pending.is_empty() {
            return Ok(Vec::new());
        }

        // Filename order is the arrival-order surrogate
        pending.sort();
        warn!("Found {} new panic recording(s)", pending.len());

        let mut consumed = Vec::new();
        for name in pending {
            let path = self.staging.join(&name);
            info!("Playing panic recording: {}", name);

            match self.player.play_blocking(&path).await {
                Ok(()) => match fs::remove_file(&path).await {
                    Ok(()) => {
                        info!("Panic recording consumed: {}", name);
                        consumed.push(name);
                    }
                    Err(e) => {
                        warn!(
                            "Played {} but could not remove it ({}); recording in ledger",
                            name, e
                        );
                        if let Err(e) = self.ledger.record(&name).await {
                            error!("Could not update played ledger for {}: {}", name, e);
                        }
                        consumed.push(name);
                    }
                },
                Err(Error::PlayerMissing(command)) => {
                    error!(
                        "Playback command '{}' not found; {} and any remaining recordings stay in staging",
                        command, name
                    );
                    return Err(Error::PlayerMissing(command));
                }
                Err(Error::NotFound(msg)) => {
                    // The file vanished between scan and play
                    warn!("{}; skipping", msg);
                }
                Err(e) => {
                    error!("Panic playback failed for {}: {}; keeping file", name, e);
                }
            }
        }

        info!("Panic pass complete ({} consumed)", consumed.len());
        Ok(consumed)
    }
}

/// Control files (ledger, half-written uploads, dotfiles) are never
/// playback candidates.
fn is_control_file(name: &str) -> bool {
    name.starts_with('.') || name.ends_with(".txt") || name.ends_with(".tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_files_are_excluded() {
        assert!(is_control_file("played_panic.txt"));
        assert!(is_control_file("upload.wav.tmp"));
        assert!(is_control_file(".DS_Store"));
        assert!(!is_control_file("siren.wav"));
        assert!(!is_control_file("recording.mp3"));
    }
}
