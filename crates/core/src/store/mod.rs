//! JSON-document-backed state stores.
//!
//! Two long-lived documents hold all persistent state: the subscription
//! list and the set of already-processed feed item identifiers. Both are
//! written atomically (temp file then rename) so a crash mid-write never
//! exposes a truncated document, and both carry a `version` field while
//! still accepting the version-less array layout older deployments wrote.

mod history;
mod subscriptions;

pub use history::HistoryStore;
pub use subscriptions::{Subscription, SubscriptionStore, SubscriptionUpdate};

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::fs;

/// Current on-disk document layout version.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a subscription for {0} already exists")]
    DuplicateUrl(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("document {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Reads a JSON document, returning `None` when the file does not exist.
async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes a JSON document atomically.
///
/// The document is serialized to a sibling `.tmp` file and renamed over
/// the destination, so readers either see the old complete document or
/// the new complete document, never a partial write.
async fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let bytes = serde_json::to_vec_pretty(document)
        .map_err(|e| write_err(std::io::Error::other(e)))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    fs::write(&tmp, &bytes).await.map_err(write_err)?;
    fs::rename(&tmp, path).await.map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_missing_document_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<Vec<String>> = read_document(&dir.path().join("missing.json"))
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_document(&path, &vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        let loaded: Option<Vec<String>> = read_document(&path).await.unwrap();
        assert_eq!(loaded.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_document(&path, &1u32).await.unwrap();
        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["doc.json"]);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, b"{not json").await.unwrap();
        let result: Result<Option<Vec<String>>, _> = read_document(&path).await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/nested/doc.json");
        write_document(&path, &42u32).await.unwrap();
        let loaded: Option<u32> = read_document(&path).await.unwrap();
        assert_eq!(loaded, Some(42));
    }
}
