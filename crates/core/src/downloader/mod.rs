//! Download queue adapter.
//!
//! Thin contract over the external download engine's control channel:
//! submit a URI, query task status, enumerate the file paths of tasks
//! that are still active or waiting. The engine owns all scheduling; the
//! pipeline only reads.

mod aria2;

pub use aria2::Aria2Client;

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Errors produced by download queue operations.
///
/// Callers treat every variant as "nothing confirmed": the affected item
/// is left unmarked and retried on the next scheduled run.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("connection to download engine failed: {0}")]
    ConnectionFailed(String),

    #[error("download engine request timed out")]
    Timeout,

    #[error("download engine rejected the request: {0}")]
    Rpc(String),

    #[error("unexpected response from download engine: {0}")]
    Protocol(String),
}

/// One file belonging to a download task.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskFile {
    #[serde(default)]
    pub path: String,
}

/// Status of a task as reported by the engine.
///
/// Numeric fields arrive as decimal strings on the wire and are kept
/// that way; the pipeline only displays them.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadStatus {
    pub gid: String,
    pub status: String,
    #[serde(default, rename = "totalLength")]
    pub total_length: String,
    #[serde(default, rename = "completedLength")]
    pub completed_length: String,
    #[serde(default)]
    pub files: Vec<TaskFile>,
}

/// Options for submitting a new download.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Target directory for the engine to download into.
    pub download_dir: Option<String>,
}

/// Trait for download engine backends.
#[async_trait]
pub trait DownloadQueue: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Submits a URI for download, returning the engine-assigned task id.
    async fn submit(&self, uri: &str, options: &SubmitOptions) -> Result<String, DownloadError>;

    /// Queries one task; `Ok(None)` when the engine no longer knows it.
    async fn status(&self, gid: &str) -> Result<Option<DownloadStatus>, DownloadError>;

    /// File paths of every task in the active or waiting state.
    async fn active_and_waiting_paths(&self) -> Result<HashSet<PathBuf>, DownloadError>;
}
