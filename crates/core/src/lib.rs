pub mod bencode;
pub mod config;
pub mod downloader;
pub mod feed;
pub mod reclaim;
pub mod scanner;
pub mod store;
pub mod testing;
pub mod transport;
pub mod uploader;

pub use bencode::{decode, derive_magnet, encode, BencodeError, MagnetError, Value};
pub use config::{
    load_config, load_config_from_str, validate_config, AlistConfig, Aria2Config, Config,
    ConfigError, SanitizedConfig, ScanConfig,
};
pub use downloader::{
    Aria2Client, DownloadError, DownloadQueue, DownloadStatus, SubmitOptions, TaskFile,
};
pub use feed::{FeedEnclosure, FeedEntry, FeedError, FeedSource, RssFeedSource};
pub use reclaim::{ReclaimError, ReclaimReport, UploadReclaimer};
pub use scanner::{FeedScanner, ScanReport};
pub use store::{
    HistoryStore, StoreError, Subscription, SubscriptionStore, SubscriptionUpdate,
};
pub use transport::{HttpTransport, Transport, TransportError};
pub use uploader::{AlistClient, StorageSink, UploadError};
