//! Alist storage backend.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Body, Client};
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::config::AlistConfig;

use super::{StorageSink, UploadError};

/// Status code the Alist API uses to signal success in its envelope.
const SUCCESS_CODE: i64 = 200;

/// Extra timeout granted per started 100 MiB of upload body.
const TIMEOUT_STEP_BYTES: u64 = 100 * 1024 * 1024;
const TIMEOUT_STEP_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct PutResponse {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Alist client implementation: single-file PUT with the destination
/// path carried in a header and the body streamed from disk.
pub struct AlistClient {
    client: Client,
    config: AlistConfig,
}

impl AlistClient {
    /// Creates a new Alist client.
    ///
    /// No client-wide timeout is set; each request gets one scaled to
    /// the size of the file it carries.
    pub fn new(config: AlistConfig) -> Self {
        let client = Client::builder()
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    fn put_url(&self) -> String {
        format!("{}/api/fs/put", self.config.url.trim_end_matches('/'))
    }

    fn upload_timeout(&self, size_bytes: u64) -> Duration {
        let base = Duration::from_secs(self.config.timeout_secs as u64);
        base + Duration::from_secs((size_bytes / TIMEOUT_STEP_BYTES) * TIMEOUT_STEP_SECS)
    }
}

#[async_trait]
impl StorageSink for AlistClient {
    fn name(&self) -> &str {
        "alist"
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), UploadError> {
        let local_read = |source| UploadError::LocalRead {
            path: local.to_path_buf(),
            source,
        };

        let size_bytes = tokio::fs::metadata(local).await.map_err(local_read)?.len();
        let file = File::open(local).await.map_err(local_read)?;
        let body = Body::wrap_stream(ReaderStream::new(file));

        debug!(
            local = %local.display(),
            remote = remote,
            size_bytes = size_bytes,
            "uploading"
        );

        let response = self
            .client
            .put(self.put_url())
            .header(AUTHORIZATION, &self.config.token)
            .header("File-Path", urlencoding::encode(remote).as_ref())
            .header(CONTENT_LENGTH, size_bytes)
            .timeout(self.upload_timeout(size_bytes))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UploadError::Timeout
                } else {
                    UploadError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let payload: PutResponse = response.json().await.map_err(|e| {
            UploadError::RequestFailed(format!("unreadable response (HTTP {status}): {e}"))
        })?;

        if payload.code != SUCCESS_CODE {
            return Err(UploadError::Rejected {
                remote: remote.to_string(),
                reason: format!("code {}: {}", payload.code, payload.message),
            });
        }

        Ok(())
    }
}
