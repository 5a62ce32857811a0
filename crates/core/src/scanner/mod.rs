//! Feed scanner: turns new feed entries into queued downloads.
//!
//! One check pass walks every enabled subscription against a single
//! run-start history snapshot, converts each new entry's torrent
//! descriptor into a magnet link and submits it to the download queue.
//! Newly-enqueued identifiers are merged into history and persisted once
//! at the end of the pass, so interrupting a run between subscriptions
//! never corrupts state; interrupted work is simply re-evaluated next
//! time and absorbed by the dedupe check.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use regex_lite::Regex;
use tracing::{debug, info, warn};

use crate::bencode;
use crate::downloader::{DownloadQueue, SubmitOptions};
use crate::feed::FeedSource;
use crate::store::{HistoryStore, StoreError, Subscription, SubscriptionStore};
use crate::transport::Transport;

/// Result of one full check pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub subscriptions_checked: usize,
    /// Identifiers confirmed enqueued during this pass, in enqueue order.
    pub newly_enqueued: Vec<String>,
}

/// Scans subscriptions and feeds the download queue.
pub struct FeedScanner {
    feed: Arc<dyn FeedSource>,
    transport: Arc<dyn Transport>,
    queue: Arc<dyn DownloadQueue>,
    /// Title filter; absent means every title passes.
    filter: Option<Regex>,
    download_dir: PathBuf,
}

impl FeedScanner {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        transport: Arc<dyn Transport>,
        queue: Arc<dyn DownloadQueue>,
        filter: Option<Regex>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            feed,
            transport,
            queue,
            filter,
            download_dir: download_dir.into(),
        }
    }

    /// One full check pass over every enabled subscription.
    ///
    /// Dedupe is evaluated against the history state at run start: an
    /// item enqueued while processing one subscription does not affect
    /// the history check of later subscriptions in the same run. The
    /// merged result is persisted exactly once, at the end.
    pub async fn run(
        &self,
        subscriptions: &SubscriptionStore,
        history: &mut HistoryStore,
    ) -> Result<ScanReport, StoreError> {
        let enabled = subscriptions.enabled();
        if enabled.is_empty() {
            info!("no enabled subscriptions");
            return Ok(ScanReport::default());
        }

        info!(subscriptions = enabled.len(), "starting feed check");
        let snapshot = history.snapshot();
        let mut newly_enqueued = Vec::new();

        for (idx, subscription) in enabled.iter().enumerate() {
            debug!(
                subscription = %subscription.name,
                index = idx + 1,
                total = enabled.len(),
                "checking subscription"
            );
            let new_ids = self.scan_subscription(subscription, &snapshot).await;
            newly_enqueued.extend(new_ids);
        }

        history.extend(newly_enqueued.iter().cloned());
        history.save().await?;

        info!(
            subscriptions = enabled.len(),
            enqueued = newly_enqueued.len(),
            "feed check complete"
        );
        Ok(ScanReport {
            subscriptions_checked: enabled.len(),
            newly_enqueued,
        })
    }

    /// Scans a single subscription against the given history snapshot.
    ///
    /// Returns the identifiers of entries that were confirmed enqueued.
    /// Entries whose conversion or submission fails are left unmarked so
    /// the next run retries them; nothing here aborts the overall pass.
    pub async fn scan_subscription(
        &self,
        subscription: &Subscription,
        history: &HashSet<String>,
    ) -> Vec<String> {
        let entries = match self.feed.fetch_entries(&subscription.url).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(subscription = %subscription.name, error = %e, "feed fetch failed");
                return Vec::new();
            }
        };
        if entries.is_empty() {
            warn!(subscription = %subscription.name, "feed returned no entries");
            return Vec::new();
        }

        let mut new_ids = Vec::new();

        // Feeds typically list newest first; walk them in reverse so
        // episodes reach the queue in chronological order.
        for entry in entries.iter().rev() {
            let Some(identifier) = entry.identifier() else {
                warn!(title = %entry.title, "entry has no usable identifier, skipping");
                continue;
            };
            if history.contains(identifier) {
                continue;
            }
            if let Some(filter) = &self.filter {
                if !filter.is_match(&entry.title) {
                    debug!(title = %entry.title, "title does not match filter");
                    continue;
                }
            }

            info!(subscription = %subscription.name, title = %entry.title, "new item");

            let Some(torrent_url) = entry.first_enclosure() else {
                debug!(title = %entry.title, "entry has no enclosure, will retry next run");
                continue;
            };
            let Some(magnet) = self.resolve_magnet(torrent_url).await else {
                continue;
            };

            let options = SubmitOptions {
                download_dir: Some(self.download_dir.display().to_string()),
            };
            match self.queue.submit(&magnet, &options).await {
                Ok(gid) => {
                    info!(gid = %gid, title = %entry.title, "enqueued");
                    new_ids.push(identifier.to_string());
                }
                Err(e) => {
                    warn!(
                        title = %entry.title,
                        error = %e,
                        "enqueue not confirmed, will retry next run"
                    );
                }
            }
        }

        new_ids
    }

    /// Fetches a torrent descriptor and derives its magnet link.
    ///
    /// Failures are logged and reported as `None`; the item stays
    /// unmarked and is retried on the next run.
    async fn resolve_magnet(&self, torrent_url: &str) -> Option<String> {
        let bytes = match self.transport.fetch(torrent_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = torrent_url, error = %e, "torrent fetch failed");
                return None;
            }
        };
        match bencode::derive_magnet(&bytes) {
            Ok(magnet) => {
                debug!(url = torrent_url, "derived magnet link");
                Some(magnet)
            }
            Err(e) => {
                warn!(url = torrent_url, error = %e, "torrent conversion failed");
                None
            }
        }
    }
}
