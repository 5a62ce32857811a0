//! Remote storage sink.
//!
//! The reclaim pass pushes finished downloads through this trait; only a
//! confirmed-success response may ever be treated as "stored remotely".

mod alist;

pub use alist::AlistClient;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read local file {path}: {source}")]
    LocalRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("upload request failed: {0}")]
    RequestFailed(String),

    #[error("upload timed out")]
    Timeout,

    /// The storage service answered but did not confirm success. An
    /// ambiguous response lands here too; it is never success.
    #[error("upload of {remote} rejected: {reason}")]
    Rejected { remote: String, reason: String },
}

/// Trait for remote storage backends.
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Uploads one local file to the remote destination path.
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), UploadError>;
}
