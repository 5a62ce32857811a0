use regex_lite::Regex;
use url::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Endpoint URLs parse and use an http(s) scheme
/// - The title filter, when set, is a valid regex
/// - The download directory is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_endpoint("aria2.url", &config.aria2.url)?;
    validate_endpoint("alist.url", &config.alist.url)?;

    if let Some(filter) = &config.scan.filter {
        Regex::new(filter).map_err(|e| {
            ConfigError::ValidationError(format!("scan.filter is not a valid regex: {e}"))
        })?;
    }

    if config.scan.download_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "scan.download_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_endpoint(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::ValidationError(format!("{key} is not a valid URL: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::ValidationError(format!(
            "{key} must use http or https, got {}",
            url.scheme()
        )));
    }
    Ok(())
}
