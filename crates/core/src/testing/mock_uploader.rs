//! Mock storage sink for testing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::uploader::{StorageSink, UploadError};

/// Mock implementation of the [`StorageSink`] trait.
///
/// Records uploads; can reject every upload (`set_always_fail`) or just
/// the next one (`set_next_error`). Rejected uploads are recorded
/// nowhere, matching a real sink that never stored the bytes.
#[derive(Default)]
pub struct MockStorageSink {
    uploads: Arc<RwLock<Vec<(PathBuf, String)>>>,
    next_error: Arc<RwLock<Option<UploadError>>>,
    always_fail: AtomicBool,
}

impl MockStorageSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All confirmed uploads as (local, remote) pairs, in order.
    pub async fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.read().await.clone()
    }

    /// Configure the next upload to fail with the given error.
    pub async fn set_next_error(&self, error: UploadError) {
        *self.next_error.write().await = Some(error);
    }

    /// Reject every upload until cleared.
    pub fn set_always_fail(&self, fail: bool) {
        self.always_fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageSink for MockStorageSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), UploadError> {
        if self.always_fail.load(Ordering::SeqCst) {
            return Err(UploadError::Rejected {
                remote: remote.to_string(),
                reason: "mock configured to fail".to_string(),
            });
        }
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.uploads
            .write()
            .await
            .push((local.to_path_buf(), remote.to_string()));
        Ok(())
    }
}
