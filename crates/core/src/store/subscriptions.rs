//! Subscription records and their persisted collection.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use super::{read_document, write_document, StoreError, DOCUMENT_VERSION};

/// A single feed subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique within the store; allocated as max existing id + 1 and
    /// never reused, even after deletion.
    pub id: u64,
    pub name: String,
    pub url: String,
    /// `bangumiId` query parameter of the feed URL, empty when absent.
    #[serde(default)]
    pub bangumi_id: String,
    /// `subgroupid` query parameter of the feed URL, empty when absent.
    #[serde(default)]
    pub subgroup_id: String,
    pub enabled: bool,
    #[serde(deserialize_with = "deserialize_added_at")]
    pub added_at: DateTime<Utc>,
}

/// Fields of an update operation; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Serialize, Deserialize)]
struct SubscriptionsDocument {
    version: u32,
    subscriptions: Vec<Subscription>,
}

/// On-disk layouts: the current versioned document, or the bare array
/// older deployments wrote. The bare form is upgraded on next save.
#[derive(Deserialize)]
#[serde(untagged)]
enum SubscriptionsOnDisk {
    Versioned(SubscriptionsDocument),
    Legacy(Vec<Subscription>),
}

/// The persisted subscription collection.
///
/// The store exclusively owns the collection; every mutating operation
/// persists the full document atomically before returning.
#[derive(Debug)]
pub struct SubscriptionStore {
    path: PathBuf,
    subscriptions: Vec<Subscription>,
}

impl SubscriptionStore {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let subscriptions = match read_document::<SubscriptionsOnDisk>(&path).await? {
            Some(SubscriptionsOnDisk::Versioned(doc)) => doc.subscriptions,
            Some(SubscriptionsOnDisk::Legacy(subscriptions)) => subscriptions,
            None => Vec::new(),
        };
        Ok(Self {
            path,
            subscriptions,
        })
    }

    /// All subscriptions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Enabled subscriptions in insertion order.
    pub fn enabled(&self) -> Vec<&Subscription> {
        self.subscriptions.iter().filter(|s| s.enabled).collect()
    }

    /// Resolves a subscription by numeric id first, falling back to an
    /// exact name match.
    pub fn find(&self, identifier: &str) -> Option<&Subscription> {
        self.position(identifier).map(|idx| &self.subscriptions[idx])
    }

    /// Adds a subscription for `url`, rejecting exact duplicates.
    pub async fn add(
        &mut self,
        url: &str,
        name: Option<&str>,
    ) -> Result<&Subscription, StoreError> {
        if self.subscriptions.iter().any(|s| s.url == url) {
            return Err(StoreError::DuplicateUrl(url.to_string()));
        }

        let (bangumi_id, subgroup_id) = parse_feed_ids(url);
        let subscription = Subscription {
            id: self.next_id(),
            name: name
                .map(str::to_string)
                .unwrap_or_else(|| format!("sub_{bangumi_id}")),
            url: url.to_string(),
            bangumi_id,
            subgroup_id,
            enabled: true,
            added_at: Utc::now(),
        };

        let idx = self.subscriptions.len();
        self.subscriptions.push(subscription);
        self.persist().await?;
        Ok(&self.subscriptions[idx])
    }

    /// Removes a subscription, returning the removed record when found.
    pub async fn remove(&mut self, identifier: &str) -> Result<Option<Subscription>, StoreError> {
        let Some(idx) = self.position(identifier) else {
            return Ok(None);
        };
        let removed = self.subscriptions.remove(idx);
        self.persist().await?;
        Ok(Some(removed))
    }

    /// Updates any subset of name, URL and enabled state in place.
    ///
    /// A new URL re-derives both feed identifiers from its query
    /// parameters.
    pub async fn update(
        &mut self,
        identifier: &str,
        update: SubscriptionUpdate,
    ) -> Result<Option<&Subscription>, StoreError> {
        let Some(idx) = self.position(identifier) else {
            return Ok(None);
        };

        {
            let subscription = &mut self.subscriptions[idx];
            if let Some(name) = update.name {
                subscription.name = name;
            }
            if let Some(url) = update.url {
                let (bangumi_id, subgroup_id) = parse_feed_ids(&url);
                subscription.url = url;
                subscription.bangumi_id = bangumi_id;
                subscription.subgroup_id = subgroup_id;
            }
            if let Some(enabled) = update.enabled {
                subscription.enabled = enabled;
            }
        }

        self.persist().await?;
        Ok(Some(&self.subscriptions[idx]))
    }

    fn next_id(&self) -> u64 {
        self.subscriptions.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    fn position(&self, identifier: &str) -> Option<usize> {
        if let Ok(id) = identifier.parse::<u64>() {
            if let Some(idx) = self.subscriptions.iter().position(|s| s.id == id) {
                return Some(idx);
            }
        }
        self.subscriptions.iter().position(|s| s.name == identifier)
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let document = SubscriptionsDocument {
            version: DOCUMENT_VERSION,
            subscriptions: self.subscriptions.clone(),
        };
        write_document(&self.path, &document).await
    }
}

/// Extracts the `bangumiId` and `subgroupid` query parameters from a feed
/// URL, taking the first occurrence of each. An unparseable URL yields
/// empty identifiers rather than an error; they are display metadata.
fn parse_feed_ids(url: &str) -> (String, String) {
    let Ok(parsed) = Url::parse(url) else {
        return (String::new(), String::new());
    };
    let mut bangumi_id = String::new();
    let mut subgroup_id = String::new();
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "bangumiId" if bangumi_id.is_empty() => bangumi_id = value.into_owned(),
            "subgroupid" if subgroup_id.is_empty() => subgroup_id = value.into_owned(),
            _ => {}
        }
    }
    (bangumi_id, subgroup_id)
}

/// Accepts both RFC 3339 timestamps and the offset-less local timestamps
/// the original deployment wrote, treating the latter as UTC.
fn deserialize_added_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_URL: &str = "https://mikan.example/RSS/Bangumi?bangumiId=3644&subgroupid=370";

    async fn store_in(dir: &tempfile::TempDir) -> SubscriptionStore {
        SubscriptionStore::load(dir.path().join("subscriptions.json"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_derives_feed_ids_and_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        let sub = store.add(FEED_URL, None).await.unwrap();
        assert_eq!(sub.id, 1);
        assert_eq!(sub.bangumi_id, "3644");
        assert_eq!(sub.subgroup_id, "370");
        assert_eq!(sub.name, "sub_3644");
        assert!(sub.enabled);
    }

    #[tokio::test]
    async fn test_add_duplicate_url_is_rejected_without_state_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        store.add(FEED_URL, Some("first")).await.unwrap();
        let result = store.add(FEED_URL, Some("second")).await;
        assert!(matches!(result, Err(StoreError::DuplicateUrl(_))));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_and_never_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        store.add("https://a.example/rss", None).await.unwrap();
        store.add("https://b.example/rss", None).await.unwrap();
        store.add("https://c.example/rss", None).await.unwrap();

        assert!(store.remove("2").await.unwrap().is_some());
        let sub = store.add("https://d.example/rss", None).await.unwrap();
        assert_eq!(sub.id, 4);
    }

    #[tokio::test]
    async fn test_find_by_id_then_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        store
            .add("https://a.example/rss", Some("alpha"))
            .await
            .unwrap();
        store.add("https://b.example/rss", Some("42")).await.unwrap();

        assert_eq!(store.find("1").unwrap().name, "alpha");
        assert_eq!(store.find("alpha").unwrap().id, 1);
        // Valid integer with no matching id still falls back to name.
        assert_eq!(store.find("42").unwrap().url, "https://b.example/rss");
        assert!(store.find("missing").is_none());
    }

    #[tokio::test]
    async fn test_update_url_rederives_feed_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        store.add(FEED_URL, Some("show")).await.unwrap();

        let update = SubscriptionUpdate {
            url: Some("https://mikan.example/RSS/Bangumi?bangumiId=99&subgroupid=7".to_string()),
            ..Default::default()
        };
        let updated = store.update("show", update).await.unwrap().unwrap();
        assert_eq!(updated.bangumi_id, "99");
        assert_eq!(updated.subgroup_id, "7");
    }

    #[tokio::test]
    async fn test_update_enabled_and_listing_filters() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        store.add("https://a.example/rss", Some("a")).await.unwrap();
        store.add("https://b.example/rss", Some("b")).await.unwrap();

        let update = SubscriptionUpdate {
            enabled: Some(false),
            ..Default::default()
        };
        store.update("a", update).await.unwrap();

        let enabled = store.enabled();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "b");
        // Insertion order is preserved for the full listing.
        let names: Vec<_> = store.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_mutations_persist_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        {
            let mut store = SubscriptionStore::load(&path).await.unwrap();
            store.add(FEED_URL, Some("show")).await.unwrap();
        }
        let store = SubscriptionStore::load(&path).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.find("show").unwrap().bangumi_id, "3644");
    }

    #[tokio::test]
    async fn test_legacy_versionless_document_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        tokio::fs::write(
            &path,
            r#"[{
                "id": 1,
                "name": "legacy",
                "url": "https://a.example/rss",
                "bangumi_id": "",
                "subgroup_id": "",
                "enabled": true,
                "added_at": "2024-05-01T09:30:00.123456"
            }]"#,
        )
        .await
        .unwrap();

        let store = SubscriptionStore::load(&path).await.unwrap();
        assert_eq!(store.find("legacy").unwrap().id, 1);
    }

    #[test]
    fn test_parse_feed_ids_missing_params_are_empty() {
        assert_eq!(
            parse_feed_ids("https://mikan.example/RSS/Bangumi"),
            (String::new(), String::new())
        );
        assert_eq!(
            parse_feed_ids("not a url"),
            (String::new(), String::new())
        );
    }
}
