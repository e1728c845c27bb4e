//! Persistence module for fetched snapshots
//!
//! This module handles:
//! - Naming artifacts after their capture instant
//! - Writing payloads as pretty-printed UTF-8 JSON
//! - Reporting write failures without touching the scheduler

mod artifact;

pub use artifact::{
    artifact_file_name, render_payload, Artifact, ARTIFACT_PREFIX, ARTIFACT_TIMESTAMP_FORMAT,
};

use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting an artifact
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for persistence operations
pub type PersistResult<T> = Result<T, PersistError>;

/// Writes artifacts into one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    directory: PathBuf,
}

impl ArtifactStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Persists `payload` under a name derived from `captured_at`
    ///
    /// # Arguments
    ///
    /// * `payload` - The JSON document to store
    /// * `captured_at` - Local wall-clock capture instant
    ///
    /// # Returns
    ///
    /// * `Ok(Artifact)` - The file was written completely
    /// * `Err(PersistError)` - Serialization or I/O failed
    pub async fn save<T>(&self, payload: &T, captured_at: NaiveDateTime) -> PersistResult<Artifact>
    where
        T: Serialize + ?Sized,
    {
        let bytes = render_payload(payload)?;

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| PersistError::CreateDir {
                path: self.directory.clone(),
                source,
            })?;

        let file_name = artifact_file_name(&captured_at);
        let path = self.directory.join(&file_name);

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| PersistError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::info!("Saved {} bytes to {}", bytes.len(), path.display());

        Ok(Artifact {
            path,
            file_name,
            captured_at,
            size: bytes.len(),
        })
    }
}
