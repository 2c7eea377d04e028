//! Source fetchers: email and Drive listings delivered as raw metadata.
//!
//! Fetchers own transport, paging and cancellation. A fetch returning fewer
//! items than requested is a normal short batch.

pub mod email;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::capture::model::{DriveFileMetadata, EmailMetadata};
use crate::error::CollaboratorError;

pub use email::parse_rfc822;

/// Lists recent emails.
#[async_trait]
pub trait EmailFetcher: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `limit` emails, newest first.
    async fn fetch_emails(&self, limit: usize) -> Result<Vec<EmailMetadata>, CollaboratorError>;
}

/// Lists recent Drive files.
#[async_trait]
pub trait DriveFetcher: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `limit` files, most recently modified first.
    async fn fetch_files(&self, limit: usize) -> Result<Vec<DriveFileMetadata>, CollaboratorError>;
}

/// Reads `.eml` files from a local directory.
pub struct MaildirFetcher {
    dir: PathBuf,
}

impl MaildirFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl EmailFetcher for MaildirFetcher {
    fn name(&self) -> &str {
        "maildir"
    }

    async fn fetch_emails(&self, limit: usize) -> Result<Vec<EmailMetadata>, CollaboratorError> {
        let unavailable = |e: std::io::Error| CollaboratorError::unavailable("maildir", e.to_string());
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(unavailable)?;
        let fetched_at = Utc::now();

        let mut emails = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "eml") {
                continue;
            }
            let raw = tokio::fs::read(&path).await.map_err(unavailable)?;
            match parse_rfc822(&raw, fetched_at) {
                Some(meta) => emails.push(meta),
                None => warn!(path = %path.display(), "Skipping unparseable message"),
            }
        }

        emails.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        emails.truncate(limit);
        debug!(count = emails.len(), dir = %self.dir.display(), "Fetched emails from maildir");
        Ok(emails)
    }
}

/// Reads a JSON array of Drive file metadata from disk.
pub struct JsonDriveFetcher {
    path: PathBuf,
}

impl JsonDriveFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DriveFetcher for JsonDriveFetcher {
    fn name(&self) -> &str {
        "json-drive"
    }

    async fn fetch_files(&self, limit: usize) -> Result<Vec<DriveFileMetadata>, CollaboratorError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CollaboratorError::unavailable("json-drive", e.to_string()))?;
        let mut files: Vec<DriveFileMetadata> = serde_json::from_str(&raw)
            .map_err(|e| CollaboratorError::unavailable("json-drive", format!("invalid listing: {e}")))?;

        files.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        files.truncate(limit);
        Ok(files)
    }
}
