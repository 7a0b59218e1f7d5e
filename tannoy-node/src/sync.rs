//! Catalog sync against the hub
//!
//! Nodes never accept catalog writes directly. On every change
//! notification the node pulls the full dump from the hub, replaces its
//! local record set, and downloads any audio bytes it does not already
//! have. Sync is best-effort: a failed pull leaves the previous local
//! copy in place and the next notification tries again.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::fs;
use tracing::{info, warn};

use tannoy_common::catalog::{ensure_safe_name, write_atomic, JsonStore};
use tannoy_common::model::{Event, Song};
use tannoy_common::{Error, Result};

/// Full catalog as served by the hub's `/api/data`.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDump {
    pub songs: Vec<Song>,
    pub events: Vec<Event>,
}

/// HTTP client for the hub's pull endpoints.
#[derive(Debug, Clone)]
pub struct HubClient {
    base: String,
    http: reqwest::Client,
}

impl HubClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base = base_url.into();
        let base = base.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { base, http })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn delivery_error(&self, what: &str, e: impl std::fmt::Display) -> Error {
        Error::Delivery {
            endpoint: self.base.clone(),
            reason: format!("{}: {}", what, e),
        }
    }

    /// Pull the full catalog dump.
    pub async fn fetch_catalog(&self) -> Result<CatalogDump> {
        let url = format!("{}/api/data", self.base);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.delivery_error("catalog fetch failed", e))?;
        if !response.status().is_success() {
            return Err(self.delivery_error("catalog fetch failed", response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| self.delivery_error("catalog parse failed", e))
    }

    /// Pull one audio file's bytes by its stored filename.
    pub async fn fetch_audio(&self, filename: &str) -> Result<Vec<u8>> {
        ensure_safe_name(filename)?;
        let url = format!("{}/api/song_file/{}", self.base, filename);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.delivery_error("audio fetch failed", e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!(
                "hub has no audio file {}",
                filename
            )));
        }
        if !response.status().is_success() {
            return Err(self.delivery_error("audio fetch failed", response.status()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.delivery_error("audio read failed", e))?;
        Ok(bytes.to_vec())
    }
}

/// Mirrors the hub catalog into the node's local stores.
pub struct Syncer {
    hub: HubClient,
    songs: JsonStore<Song>,
    events: JsonStore<Event>,
    audio_dir: PathBuf,
    panic_dir: PathBuf,
}

impl Syncer {
    pub fn new(
        hub: HubClient,
        songs: JsonStore<Song>,
        events: JsonStore<Event>,
        audio_dir: impl Into<PathBuf>,
        panic_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hub,
            songs,
            events,
            audio_dir: audio_dir.into(),
            panic_dir: panic_dir.into(),
        }
    }

    pub fn hub(&self) -> &HubClient {
        &self.hub
    }

    /// One full sync: pull the dump, replace the local record set, then
    /// download whatever audio is referenced but not on disk.
    pub async fn sync_catalog(&self) -> Result<()> {
        let dump = self.hub.fetch_catalog().await?;
        info!(
            "Syncing catalog from {} ({} songs, {} events)",
            self.hub.base(),
            dump.songs.len(),
            dump.events.len()
        );

        self.replace_records(&self.songs, dump.songs.clone()).await?;
        self.replace_records(&self.events, dump.events).await?;
        self.download_missing_audio(&dump.songs).await;
        Ok(())
    }

    /// Upsert every record from the dump and drop local records the hub
    /// no longer has, so deletions propagate.
    async fn replace_records<T: tannoy_common::catalog::Record>(
        &self,
        store: &JsonStore<T>,
        records: Vec<T>,
    ) -> Result<()> {
        let mut keep = HashSet::new();
        for record in records {
            match store.upsert(record).await {
                Ok(stored) => {
                    keep.insert(stored.id().to_string());
                }
                Err(e) => warn!("Skipping record from hub dump: {}", e),
            }
        }
        for local in store.list().await? {
            if !keep.contains(local.id()) {
                store.delete(local.id()).await?;
            }
        }
        Ok(())
    }

    /// Download audio for songs whose file is not on disk yet. Failures
    /// are logged per file; the next sync retries.
    async fn download_missing_audio(&self, songs: &[Song]) {
        for song in songs {
            let Some(filename) = song.filename.as_deref() else {
                continue;
            };
            if self.audio_dir.join(filename).is_file() {
                continue;
            }
            match self.hub.fetch_audio(filename).await {
                Ok(bytes) => match write_atomic(&self.audio_dir, filename, &bytes).await {
                    Ok(()) => info!("Downloaded audio {} ({} bytes)", filename, bytes.len()),
                    Err(e) => warn!("Could not store audio {}: {}", filename, e),
                },
                Err(e) => warn!("Could not download audio {}: {}", filename, e),
            }
        }
    }

    /// Pull a panic recording and stage it for playback. The write is
    /// atomic so the panic detector never sees a half-downloaded file.
    pub async fn stash_panic(&self, filename: &str) -> Result<PathBuf> {
        ensure_safe_name(filename)?;
        fs::create_dir_all(&self.panic_dir).await?;
        let bytes = self.hub.fetch_audio(filename).await?;
        write_atomic(&self.panic_dir, filename, &bytes).await?;
        let path = self.panic_dir.join(filename);
        info!(
            "Panic recording staged: {} ({} bytes)",
            path.display(),
            bytes.len()
        );
        Ok(path)
    }

    pub fn panic_dir(&self) -> &Path {
        &self.panic_dir
    }
}
