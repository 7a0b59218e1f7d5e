//! External playback command invocation
//!
//! Wraps the configured player command (`mpg123` by default). Playback is
//! either detached (scheduled bells, fire-and-forget) or blocking (panic
//! recordings, which must finish before anything else plays). The two
//! failure modes the callers care about stay distinguishable: the command
//! not being installed at all versus the command running and failing.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use tannoy_common::{Error, Result};

/// Handle on the external audio player command.
#[derive(Debug, Clone)]
pub struct Player {
    command: String,
}

impl Player {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Start playback and return as soon as the process has launched.
    pub async fn spawn_detached(&self, path: &Path) -> Result<()> {
        self.ensure_resource(path)?;
        debug!("Spawning {} {} (detached)", self.command, path.display());
        match self.build_command(path).spawn() {
            Ok(_child) => {
                info!("Playback started: {}", path.display());
                Ok(())
            }
            Err(e) => Err(self.map_launch_error(e)),
        }
    }

    /// Play to completion, waiting for the process to exit.
    pub async fn play_blocking(&self, path: &Path) -> Result<()> {
        self.ensure_resource(path)?;
        debug!("Running {} {} (blocking)", self.command, path.display());
        let status = match self.build_command(path).status().await {
            Ok(status) => status,
            Err(e) => return Err(self.map_launch_error(e)),
        };
        if status.success() {
            Ok(())
        } else {
            Err(Error::Playback(format!(
                "{} exited with {} for {}",
                self.command,
                status,
                path.display()
            )))
        }
    }

    fn build_command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg(path).stdout(Stdio::null()).stderr(Stdio::null());
        cmd
    }

    fn ensure_resource(&self, path: &Path) -> Result<()> {
        if path.is_file() {
            Ok(())
        } else {
            Err(Error::NotFound(format!(
                "audio resource missing: {}",
                path.display()
            )))
        }
    }

    fn map_launch_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::PlayerMissing(self.command.clone())
        } else {
            Error::Io(e)
        }
    }
}
