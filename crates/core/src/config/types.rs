use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub aria2: Aria2Config,
    #[serde(default)]
    pub alist: AlistConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Download engine (aria2 JSON-RPC endpoint) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Aria2Config {
    /// JSON-RPC endpoint (e.g. "http://localhost:6800/jsonrpc")
    #[serde(default = "default_aria2_url")]
    pub url: String,
    /// Shared RPC secret; empty disables token authentication
    #[serde(default)]
    pub secret: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_aria2_timeout")]
    pub timeout_secs: u32,
}

impl Default for Aria2Config {
    fn default() -> Self {
        Self {
            url: default_aria2_url(),
            secret: String::new(),
            timeout_secs: default_aria2_timeout(),
        }
    }
}

fn default_aria2_url() -> String {
    "http://localhost:6800/jsonrpc".to_string()
}

fn default_aria2_timeout() -> u32 {
    10
}

/// Remote storage (Alist) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlistConfig {
    /// Alist server URL (e.g. "http://127.0.0.1:5244")
    #[serde(default = "default_alist_url")]
    pub url: String,
    /// API token sent in the Authorization header
    #[serde(default)]
    pub token: String,
    /// Remote directory finished downloads are uploaded under
    #[serde(default = "default_remote_root")]
    pub remote_root: String,
    /// Base upload timeout in seconds, scaled up for large files
    #[serde(default = "default_alist_timeout")]
    pub timeout_secs: u32,
}

impl Default for AlistConfig {
    fn default() -> Self {
        Self {
            url: default_alist_url(),
            token: String::new(),
            remote_root: default_remote_root(),
            timeout_secs: default_alist_timeout(),
        }
    }
}

fn default_alist_url() -> String {
    "http://127.0.0.1:5244".to_string()
}

fn default_remote_root() -> String {
    "/Anime".to_string()
}

fn default_alist_timeout() -> u32 {
    300
}

/// Feed scanning configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Title filter regex (e.g. "1080[pP]"); absent means no filtering
    #[serde(default)]
    pub filter: Option<String>,
    /// Directory the download engine writes into
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Subscription collection document
    #[serde(default = "default_subscriptions_file")]
    pub subscriptions_file: PathBuf,
    /// Processed-item history document
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
    /// Timeout for feed and torrent fetches in seconds (default: 30)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            filter: None,
            download_dir: default_download_dir(),
            subscriptions_file: default_subscriptions_file(),
            history_file: default_history_file(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_subscriptions_file() -> PathBuf {
    PathBuf::from("subscriptions.json")
}

fn default_history_file() -> PathBuf {
    PathBuf::from("downloaded.json")
}

fn default_fetch_timeout() -> u32 {
    30
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub aria2: SanitizedAria2Config,
    pub alist: SanitizedAlistConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAria2Config {
    pub url: String,
    pub secret_configured: bool,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAlistConfig {
    pub url: String,
    pub token_configured: bool,
    pub remote_root: String,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            aria2: SanitizedAria2Config {
                url: config.aria2.url.clone(),
                secret_configured: !config.aria2.secret.is_empty(),
                timeout_secs: config.aria2.timeout_secs,
            },
            alist: SanitizedAlistConfig {
                url: config.alist.url.clone(),
                token_configured: !config.alist.token.is_empty(),
                remote_root: config.alist.remote_root.clone(),
                timeout_secs: config.alist.timeout_secs,
            },
            scan: config.scan.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.aria2.url, "http://localhost:6800/jsonrpc");
        assert_eq!(config.aria2.timeout_secs, 10);
        assert_eq!(config.alist.remote_root, "/Anime");
        assert_eq!(config.scan.filter, None);
        assert_eq!(config.scan.download_dir.to_str().unwrap(), "downloads");
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[aria2]
url = "http://aria2.lan:6800/jsonrpc"
secret = "hunter2"
timeout_secs = 5

[alist]
url = "http://alist.lan:5244"
token = "alist-token"
remote_root = "/Media/Anime"

[scan]
filter = "1080[pP]"
download_dir = "/data/downloads"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.aria2.secret, "hunter2");
        assert_eq!(config.aria2.timeout_secs, 5);
        assert_eq!(config.alist.remote_root, "/Media/Anime");
        assert_eq!(config.scan.filter.as_deref(), Some("1080[pP]"));
        assert_eq!(
            config.scan.download_dir.to_str().unwrap(),
            "/data/downloads"
        );
        // Unspecified fields keep their defaults.
        assert_eq!(config.alist.timeout_secs, 300);
        assert_eq!(config.scan.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_sanitized_config_redacts_secrets() {
        let mut config = Config::default();
        config.aria2.secret = "hunter2".to_string();

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.aria2.secret_configured);
        assert!(!sanitized.alist.token_configured);

        let rendered = serde_json::to_string(&sanitized).unwrap();
        assert!(!rendered.contains("hunter2"));
    }
}
