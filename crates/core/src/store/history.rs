//! The set of already-processed feed item identifiers.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{read_document, write_document, StoreError, DOCUMENT_VERSION};

#[derive(Serialize, Deserialize)]
struct HistoryDocument {
    version: u32,
    seen: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryOnDisk {
    Versioned(HistoryDocument),
    Legacy(Vec<String>),
}

/// Append-only history of processed item identifiers.
///
/// Membership checks go through a hash set; the insertion order is kept
/// separately so the persisted document stays stable and diffable.
/// Loaded once at the start of a run and persisted once at the end.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    order: Vec<String>,
    seen: HashSet<String>,
}

impl HistoryStore {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let order = match read_document::<HistoryOnDisk>(&path).await? {
            Some(HistoryOnDisk::Versioned(doc)) => doc.seen,
            Some(HistoryOnDisk::Legacy(seen)) => seen,
            None => Vec::new(),
        };
        let seen = order.iter().cloned().collect();
        Ok(Self { path, order, seen })
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    /// A copy of the current membership set, used as the frozen
    /// run-start view while the live store accumulates new identifiers.
    pub fn snapshot(&self) -> HashSet<String> {
        self.seen.clone()
    }

    /// Records identifiers, ignoring ones already present.
    pub fn extend(&mut self, identifiers: impl IntoIterator<Item = String>) {
        for identifier in identifiers {
            if self.seen.insert(identifier.clone()) {
                self.order.push(identifier);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Persists the whole collection atomically.
    pub async fn save(&self) -> Result<(), StoreError> {
        let document = HistoryDocument {
            version: DOCUMENT_VERSION,
            seen: self.order.clone(),
        };
        write_document(&self.path, &document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("downloaded.json"))
            .await
            .unwrap();
        assert!(store.is_empty());
        assert!(!store.contains("anything"));
    }

    #[tokio::test]
    async fn test_extend_save_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloaded.json");
        {
            let mut store = HistoryStore::load(&path).await.unwrap();
            store.extend(["ep1".to_string(), "ep2".to_string()]);
            store.save().await.unwrap();
        }
        let store = HistoryStore::load(&path).await.unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains("ep1"));
        assert!(store.contains("ep2"));
    }

    #[tokio::test]
    async fn test_extend_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoryStore::load(dir.path().join("downloaded.json"))
            .await
            .unwrap();
        store.extend(["ep1".to_string(), "ep1".to_string()]);
        store.extend(["ep1".to_string()]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_frozen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoryStore::load(dir.path().join("downloaded.json"))
            .await
            .unwrap();
        store.extend(["ep1".to_string()]);
        let snapshot = store.snapshot();
        store.extend(["ep2".to_string()]);
        assert!(snapshot.contains("ep1"));
        assert!(!snapshot.contains("ep2"));
    }

    #[tokio::test]
    async fn test_legacy_bare_array_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloaded.json");
        tokio::fs::write(&path, r#"["ep1", "ep2"]"#).await.unwrap();
        let store = HistoryStore::load(&path).await.unwrap();
        assert!(store.contains("ep1"));
        assert_eq!(store.len(), 2);
    }
}
