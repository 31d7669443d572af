//! Stale temp-file sweeper
//!
//! Spooled uploads are normally deleted by their `TempImage` guard; files
//! orphaned by a crash stay behind. The sweeper walks the temp directory on
//! an interval and removes anything older than the configured age.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

pub struct TempFileSweeper {
    temp_dir: PathBuf,
    max_age: Duration,
    sweep_interval: Duration,
}

impl TempFileSweeper {
    pub fn new(temp_dir: PathBuf, max_age: Duration, sweep_interval: Duration) -> Self {
        Self {
            temp_dir,
            max_age,
            sweep_interval,
        }
    }

    /// Start the background sweep task.
    /// Returns a JoinHandle for graceful shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.sweep_interval);
            // The first tick fires immediately; skip it so startup stays quiet.
            sweep_interval.tick().await;

            loop {
                sweep_interval.tick().await;

                match self.sweep().await {
                    Ok(0) => {}
                    Ok(removed) => {
                        tracing::info!(removed, "Removed stale temp upload files");
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "Temp file sweep failed");
                    }
                }
            }
        })
    }

    /// Remove files in the temp directory older than `max_age`.
    pub async fn sweep(&self) -> Result<usize, anyhow::Error> {
        let mut removed = 0;

        let mut entries = match tokio::fs::read_dir(&self.temp_dir).await {
            Ok(entries) => entries,
            // Nothing spooled yet
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok());
            let stale = match age {
                Some(age) => age > self.max_age,
                // Unreadable mtime: leave the file alone
                None => false,
            };

            if stale {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => {
                        tracing::debug!(path = %entry.path().display(), "Removed stale temp file");
                        removed += 1;
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => {
                        tracing::warn!(
                            path = %entry.path().display(),
                            error = %err,
                            "Failed to remove stale temp file"
                        );
                    }
                }
            }
        }

        Ok(removed)
    }
}
