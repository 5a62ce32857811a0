//! Mock download queue for testing.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::downloader::{DownloadError, DownloadQueue, DownloadStatus, SubmitOptions};

/// A recorded submission for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSubmit {
    pub uri: String,
    pub download_dir: Option<String>,
}

/// Mock implementation of the [`DownloadQueue`] trait.
///
/// Records submissions, serves configurable task statuses and in-flight
/// path sets, and fails the next call when an error is injected.
#[derive(Default)]
pub struct MockDownloadQueue {
    submitted: Arc<RwLock<Vec<RecordedSubmit>>>,
    statuses: Arc<RwLock<HashMap<String, DownloadStatus>>>,
    in_flight: Arc<RwLock<HashSet<PathBuf>>>,
    next_error: Arc<RwLock<Option<DownloadError>>>,
    gid_counter: Arc<RwLock<u32>>,
}

impl MockDownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded submissions, in order.
    pub async fn submissions(&self) -> Vec<RecordedSubmit> {
        self.submitted.read().await.clone()
    }

    /// Marks a path as belonging to an active or waiting task.
    pub async fn add_in_flight(&self, path: impl Into<PathBuf>) {
        self.in_flight.write().await.insert(path.into());
    }

    /// Pre-populates a task status (for testing status queries).
    pub async fn set_status(&self, status: DownloadStatus) {
        self.statuses
            .write()
            .await
            .insert(status.gid.clone(), status);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: DownloadError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<DownloadError> {
        self.next_error.write().await.take()
    }

    async fn generate_gid(&self) -> String {
        let mut counter = self.gid_counter.write().await;
        *counter += 1;
        format!("gid{:08x}", *counter)
    }
}

#[async_trait]
impl DownloadQueue for MockDownloadQueue {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, uri: &str, options: &SubmitOptions) -> Result<String, DownloadError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        self.submitted.write().await.push(RecordedSubmit {
            uri: uri.to_string(),
            download_dir: options.download_dir.clone(),
        });
        Ok(self.generate_gid().await)
    }

    async fn status(&self, gid: &str) -> Result<Option<DownloadStatus>, DownloadError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        Ok(self.statuses.read().await.get(gid).cloned())
    }

    async fn active_and_waiting_paths(&self) -> Result<HashSet<PathBuf>, DownloadError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        Ok(self.in_flight.read().await.clone())
    }
}
