//! JSON-file catalog persistence
//!
//! Each record lives in its own `{id}.json` file inside a per-collection
//! directory, and audio bytes live next to them under generated unique
//! names. Writes always go to a `*.tmp` sibling first and are renamed into
//! place, so a concurrent reader never observes a partially written record
//! and a half-uploaded recording never becomes visible under its final
//! name.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

use crate::model::{Event, Song};
use crate::{Error, Result};

/// A record storable in a [`JsonStore`].
///
/// Identity is a string id; the store assigns a fresh UUID on upsert when
/// the record arrives without one.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn validate(&self) -> Result<()>;
}

impl Record for Song {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(&self) -> Result<()> {
        Song::validate(self)
    }
}

impl Record for Event {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(&self) -> Result<()> {
        Event::validate(self)
    }
}

/// Reject names that could escape the collection directory.
pub fn ensure_safe_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(Error::InvalidInput(format!("unsafe name: {:?}", name)));
    }
    Ok(())
}

/// Write `bytes` under `dir/name` atomically (temp file + rename).
pub async fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let tmp = dir.join(format!("{}.tmp", name));
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, dir.join(name)).await?;
    Ok(())
}

/// One JSON-file-per-record collection store.
#[derive(Debug, Clone)]
pub struct JsonStore<T: Record> {
    dir: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> JsonStore<T> {
    /// Open (and create if needed) the collection directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            _marker: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf> {
        ensure_safe_name(id)?;
        Ok(self.dir.join(format!("{}.json", id)))
    }

    /// Fetch a record by id; `None` when absent or unreadable.
    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        let path = self.record_path(id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Skipping unreadable record {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// List every readable record in the collection.
    ///
    /// Unreadable files are logged and skipped rather than failing the
    /// whole listing.
    pub async fn list(&self) -> Result<Vec<T>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
                },
                Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }

    /// List records keyed by id.
    pub async fn map_by_id(&self) -> Result<HashMap<String, T>> {
        let records = self.list().await?;
        Ok(records
            .into_iter()
            .map(|r| (r.id().to_string(), r))
            .collect())
    }

    /// Validate and persist a record, assigning a fresh UUID id when the
    /// record arrives without one. Returns the stored record.
    pub async fn upsert(&self, mut record: T) -> Result<T> {
        record.validate()?;
        if record.id().is_empty() {
            record.set_id(Uuid::new_v4().to_string());
        }
        ensure_safe_name(record.id())?;
        let json = serde_json::to_vec_pretty(&record)?;
        write_atomic(&self.dir, &format!("{}.json", record.id()), &json).await?;
        Ok(record)
    }

    /// Delete a record; `false` when it did not exist.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let path = self.record_path(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Raw audio bytes stored next to the catalog, addressed by generated
/// unique filenames.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store uploaded bytes under a fresh `{uuid}{ext}` name, keeping the
    /// upload's extension (`.mp3` when it has none).
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_else(|| ".mp3".to_string());
        let unique = format!("{}{}", Uuid::new_v4(), ext);
        write_atomic(&self.dir, &unique, bytes).await?;
        Ok(unique)
    }

    /// Sanitized path of a stored file (may or may not exist).
    pub fn path_of(&self, filename: &str) -> Result<PathBuf> {
        ensure_safe_name(filename)?;
        Ok(self.dir.join(filename))
    }

    /// Read a stored file; `None` when absent.
    pub async fn read(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_of(filename)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored file; `false` when it did not exist.
    pub async fn delete(&self, filename: &str) -> Result<bool> {
        let path = self.path_of(filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
