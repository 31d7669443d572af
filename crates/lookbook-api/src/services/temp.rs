//! Spooled upload files
//!
//! Every accepted upload is written to the temp directory under a
//! collision-resistant name and deleted exactly once, on every exit path,
//! when the `TempImage` guard drops.

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

/// A spooled upload. Removing the file is the guard's job: success, parse
/// failure, and external-call failure all release it the same way.
#[derive(Debug)]
pub struct TempImage {
    path: PathBuf,
    original_filename: String,
    extension: String,
}

impl TempImage {
    /// Write `data` to the temp directory under
    /// `{unix_millis}-{uuid}.{extension}`.
    pub async fn spool(
        temp_dir: &Path,
        original_filename: &str,
        data: &[u8],
    ) -> std::io::Result<Self> {
        let extension = Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "bin".to_string());

        tokio::fs::create_dir_all(temp_dir).await?;

        let name = format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            extension
        );
        let path = temp_dir.join(name);
        tokio::fs::write(&path, data).await?;

        tracing::debug!(path = %path.display(), size = data.len(), "Upload spooled to temp file");

        Ok(Self {
            path,
            original_filename: original_filename.to_string(),
            extension,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Original filename stem with a `.jpg` extension, for re-hosted buffers
    /// (the preprocessor always emits JPEG).
    pub fn jpeg_filename(&self) -> String {
        let stem = Path::new(&self.original_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload");
        format!("{}.jpg", stem)
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Failed to delete temp upload file"
                );
            }
        } else {
            tracing::debug!(path = %self.path.display(), "Temp upload file deleted");
        }
    }
}
