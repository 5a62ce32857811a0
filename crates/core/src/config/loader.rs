use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// A missing file is not an error: every option has a default, and
/// deployments driven purely by `BANGUMI_*` environment variables are
/// supported. Nested keys use a double underscore in the environment
/// (e.g. `BANGUMI_ARIA2__SECRET`).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    }
    figment
        .merge(Env::prefixed("BANGUMI_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[aria2]
secret = "hunter2"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.aria2.secret, "hunter2");
    }

    #[test]
    fn test_load_config_from_str_invalid_toml() {
        let result = load_config_from_str("[aria2\nsecret = ");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.aria2.url, "http://localhost:6800/jsonrpc");
        assert_eq!(config.alist.remote_root, "/Anime");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[scan]
filter = "1080[pP]"
download_dir = "/data/downloads"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.scan.filter.as_deref(), Some("1080[pP]"));
        assert_eq!(
            config.scan.download_dir.to_str().unwrap(),
            "/data/downloads"
        );
        // File options merge over defaults without clearing them.
        assert_eq!(config.aria2.timeout_secs, 10);
    }
}
