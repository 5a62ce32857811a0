//! Feed source abstraction.
//!
//! The scanner consumes feeds as a finite sequence of [`FeedEntry`]
//! values; how they are fetched and parsed is a source implementation
//! detail behind [`FeedSource`].

mod rss;

pub use rss::RssFeedSource;

use async_trait::async_trait;
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to parse feed from {url}: {reason}")]
    Parse { url: String, reason: String },
}

/// A downloadable attachment advertised by a feed entry.
#[derive(Debug, Clone)]
pub struct FeedEnclosure {
    pub href: String,
}

/// One feed item, reduced to the fields the pipeline needs.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub title: String,
    pub guid: Option<String>,
    /// Atom-style entry id; RSS items do not carry one.
    pub id: Option<String>,
    pub link: Option<String>,
    pub enclosures: Vec<FeedEnclosure>,
}

impl FeedEntry {
    /// Stable identifier for dedupe: guid, then id, then link.
    pub fn identifier(&self) -> Option<&str> {
        self.guid
            .as_deref()
            .or(self.id.as_deref())
            .or(self.link.as_deref())
    }

    pub fn first_enclosure(&self) -> Option<&str> {
        self.enclosures.first().map(|e| e.href.as_str())
    }
}

/// Trait every feed backend implements.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches and parses the feed at `url` into entries, in the order
    /// the feed lists them (typically newest first).
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>, FeedError>;
}
