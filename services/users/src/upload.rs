//! Staging area for uploaded files
//!
//! An upload is written to a uniquely named file in the staging directory,
//! inspected, and then either handed over to the store or deleted. A
//! [`StagedFile`] that is dropped without being kept removes itself.

use axum::extract::multipart::{Field, MultipartError};
use chrono::Utc;
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::validation::sanitize_filename;

/// Failures while staging an upload
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Failed to create upload directory: {0}")]
    CreateDir(#[source] io::Error),

    #[error("Failed to create staged file: {0}")]
    CreateFile(#[source] io::Error),

    #[error("Failed to write staged file: {0}")]
    Write(#[source] io::Error),

    /// The client stream broke off; the request, not the server, is at fault
    #[error("Failed to read upload stream: {0}")]
    Stream(#[source] MultipartError),
}

/// Directory where uploads wait for inspection
#[derive(Debug, Clone)]
pub struct UploadStaging {
    dir: PathBuf,
}

impl UploadStaging {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `{unix-timestamp}_{random}_{sanitized-filename}`
    pub fn staged_name(original_filename: &str) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}_{}_{}",
            Utc::now().timestamp(),
            &suffix[..12],
            sanitize_filename(original_filename)
        )
    }

    /// Create the directory if needed and open a fresh file in it.
    ///
    /// `create_new` guarantees an existing file is never overwritten.
    pub async fn create(&self, original_filename: &str) -> Result<(StagedFile, File), StagingError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(StagingError::CreateDir)?;

        let path = self.dir.join(Self::staged_name(original_filename));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(StagingError::CreateFile)?;

        debug!("Staged upload at {}", path.display());

        Ok((StagedFile::new(path), file))
    }

    /// Stream a multipart field into a new staged file.
    ///
    /// On any failure the partial file is removed before returning.
    pub async fn stage_field(&self, mut field: Field<'_>) -> Result<StagedFile, StagingError> {
        let original_filename = field.file_name().unwrap_or_default().to_string();
        let (staged, mut file) = self.create(&original_filename).await?;

        let copied = async {
            while let Some(chunk) = field.chunk().await.map_err(StagingError::Stream)? {
                file.write_all(&chunk).await.map_err(StagingError::Write)?;
            }
            file.flush().await.map_err(StagingError::Write)
        }
        .await;

        drop(file);

        if let Err(e) = copied {
            staged.discard().await;
            return Err(e);
        }

        Ok(staged)
    }
}

/// A file in the staging directory owned by one request
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reopen the file for reading
    pub async fn open(&self) -> io::Result<File> {
        File::open(&self.path).await
    }

    /// Delete the file now. Completes before returning so the caller can
    /// respond knowing the file is gone.
    pub async fn discard(mut self) {
        self.armed = false;
        match fs::remove_file(&self.path).await {
            Ok(()) => debug!("Discarded staged upload {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to discard staged upload {}: {}",
                self.path.display(),
                e
            ),
        }
    }

    /// Stop tracking the file; it now belongs to the store
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(
                        "Failed to remove abandoned upload {}: {}",
                        self.path.display(),
                        e
                    );
                }
            }
        }
    }
}
