//! Configuration loading and storage layout
//!
//! Config values resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The binaries apply 1 and 2 through clap; this module covers 3 and 4
//! plus locating the config file itself.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{Error, Result};

/// Environment variable naming an explicit config file path
pub const CONFIG_ENV_VAR: &str = "TANNOY_CONFIG";

/// On-disk layout under a service's root folder.
///
/// Matches the storage convention both services share: per-collection
/// record directories, audio bytes next to the records, panic staging and
/// ledger at the top.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn songs_dir(&self) -> PathBuf {
        self.root.join("songs")
    }

    pub fn events_dir(&self) -> PathBuf {
        self.root.join("events")
    }

    pub fn panic_dir(&self) -> PathBuf {
        self.root.join("panic")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join("played_panic.txt")
    }
}

/// Hub (central catalog server) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    pub root_folder: PathBuf,
    /// Receiver endpoints the fanout delivers to, e.g.
    /// `http://192.168.1.227:5000/api/webhook_receive`
    pub receivers: Vec<String>,
    /// Per-receiver delivery timeout
    pub fanout_timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            root_folder: default_root_folder(),
            receivers: Vec::new(),
            fanout_timeout_secs: 5,
        }
    }
}

/// Node (playback receiver) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub root_folder: PathBuf,
    /// Base URL of the hub this node syncs from
    pub hub_url: String,
    /// External playback command invoked with a file path argument
    pub player_command: String,
    /// Scheduler base tick period
    pub tick_secs: u64,
    /// Panic detector pass period
    pub panic_pass_secs: u64,
    /// Event matcher pass period
    pub event_pass_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            root_folder: default_root_folder(),
            hub_url: "http://127.0.0.1:8000".to_string(),
            player_command: "mpg123".to_string(),
            tick_secs: 1,
            panic_pass_secs: 5,
            event_pass_secs: 60,
        }
    }
}

/// Load a config following the file-resolution half of the priority order:
/// explicit path, `TANNOY_CONFIG`, platform config dir (`/etc/tannoy` as
/// the system fallback on Linux), compiled defaults.
pub fn load_config<T>(explicit: Option<&Path>, file_name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if let Some(path) = explicit {
        return read_config_file(path);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return read_config_file(Path::new(&path));
    }

    for candidate in default_config_paths(file_name) {
        if candidate.exists() {
            return read_config_file(&candidate);
        }
    }

    Ok(T::default())
}

fn read_config_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&text)
        .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
}

fn default_config_paths(file_name: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("tannoy").join(file_name));
    }
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/tannoy").join(file_name));
    }
    candidates
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tannoy"))
        .unwrap_or_else(|| PathBuf::from("./tannoy_data"))
}
