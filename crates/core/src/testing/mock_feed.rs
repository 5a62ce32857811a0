//! Mock feed source for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::feed::{FeedEntry, FeedError, FeedSource};
use crate::transport::TransportError;

/// Mock implementation of the [`FeedSource`] trait.
///
/// Serves canned entry lists by feed URL. An unknown URL behaves like an
/// unreachable feed host; `set_next_error` forces the next fetch to fail
/// regardless of URL.
#[derive(Default)]
pub struct MockFeedSource {
    feeds: Arc<RwLock<HashMap<String, Vec<FeedEntry>>>>,
    next_error: Arc<RwLock<Option<FeedError>>>,
}

impl MockFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the entries served for `url`.
    pub async fn insert(&self, url: impl Into<String>, entries: Vec<FeedEntry>) {
        self.feeds.write().await.insert(url.into(), entries);
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: FeedError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>, FeedError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.feeds.read().await.get(url).cloned().ok_or_else(|| {
            FeedError::Transport(TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: "no canned feed".to_string(),
            })
        })
    }
}
