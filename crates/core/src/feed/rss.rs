//! RSS 2.0 feed backend.

use std::sync::Arc;

use async_trait::async_trait;
use rss::{Channel, Item};

use crate::transport::Transport;

use super::{FeedEnclosure, FeedEntry, FeedError, FeedSource};

/// Feed source that fetches RSS documents through the injected transport.
pub struct RssFeedSource {
    transport: Arc<dyn Transport>,
}

impl RssFeedSource {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>, FeedError> {
        let bytes = self.transport.fetch(url).await?;
        let channel = Channel::read_from(&bytes[..]).map_err(|e| FeedError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(channel.items().iter().map(entry_from_item).collect())
    }
}

fn entry_from_item(item: &Item) -> FeedEntry {
    FeedEntry {
        title: item.title().unwrap_or_default().to_string(),
        guid: item.guid().map(|g| g.value().to_string()),
        id: None,
        link: item.link().map(str::to_string),
        enclosures: item
            .enclosure()
            .map(|e| {
                vec![FeedEnclosure {
                    href: e.url().to_string(),
                }]
            })
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    const FEED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Mikan Project - Show</title>
    <link>https://mikan.example</link>
    <description>updates</description>
    <item>
      <title>Show S01E02 1080p</title>
      <link>https://mikan.example/ep/2</link>
      <guid isPermaLink="false">ep2-guid</guid>
      <enclosure url="https://mikan.example/t/2.torrent" length="1" type="application/x-bittorrent"/>
    </item>
    <item>
      <title>Show S01E01 1080p</title>
      <link>https://mikan.example/ep/1</link>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn test_fetch_entries_maps_items() {
        let transport = Arc::new(MockTransport::new());
        transport
            .insert("https://mikan.example/rss", FEED_XML.as_bytes().to_vec())
            .await;

        let source = RssFeedSource::new(transport);
        let entries = source
            .fetch_entries("https://mikan.example/rss")
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Show S01E02 1080p");
        assert_eq!(entries[0].guid.as_deref(), Some("ep2-guid"));
        assert_eq!(
            entries[0].first_enclosure(),
            Some("https://mikan.example/t/2.torrent")
        );
        // The second item has no guid or enclosure; the link identifies it.
        assert_eq!(entries[1].guid, None);
        assert_eq!(entries[1].identifier(), Some("https://mikan.example/ep/1"));
        assert!(entries[1].enclosures.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_document_is_a_parse_error() {
        let transport = Arc::new(MockTransport::new());
        transport
            .insert("https://mikan.example/rss", b"not xml at all".to_vec())
            .await;

        let source = RssFeedSource::new(transport);
        let result = source.fetch_entries("https://mikan.example/rss").await;
        assert!(matches!(result, Err(FeedError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let source = RssFeedSource::new(Arc::new(MockTransport::new()));
        let result = source.fetch_entries("https://mikan.example/rss").await;
        assert!(matches!(result, Err(FeedError::Transport(_))));
    }
}
