//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable that overrides `api.access_token`.
pub const ACCESS_TOKEN_ENV: &str = "CANVAS_ACCESS_TOKEN";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Binary download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Snapshot, export and log locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Console logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            let mut config = Self::default();
            config.apply_env();
            config
        })
    }

    /// Let the environment supply the bearer credential.
    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.api.access_token = token;
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::validation("api.base_url is empty"));
        }
        url::Url::parse(&self.api.base_url)
            .map_err(|e| AppError::validation(format!("api.base_url is invalid: {e}")))?;
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.per_page == 0 {
            return Err(AppError::validation("api.per_page must be > 0"));
        }
        if self.download.timeout_secs == 0 {
            return Err(AppError::validation("download.timeout_secs must be > 0"));
        }
        if self.paths.exports_dir.as_os_str().is_empty() {
            return Err(AppError::validation("paths.exports_dir is empty"));
        }
        if self.paths.json_dir.as_os_str().is_empty() {
            return Err(AppError::validation("paths.json_dir is empty"));
        }
        Ok(())
    }
}

/// Remote API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root, endpoints are joined onto it (e.g. `https://lms.example.edu/api/v1/`)
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Static bearer credential
    #[serde(default)]
    pub access_token: String,

    /// Account whose courses are archived
    #[serde(default = "defaults::account_id")]
    pub account_id: u64,

    /// Page-size hint sent with every collection request
    #[serde(default = "defaults::per_page")]
    pub per_page: u32,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            access_token: String::new(),
            account_id: defaults::account_id(),
            per_page: defaults::per_page(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Binary download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Per-attempt request timeout in seconds
    #[serde(default = "defaults::download_timeout")]
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::download_timeout(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding JSON snapshots
    #[serde(default = "defaults::json_dir")]
    pub json_dir: PathBuf,

    /// Root of the per-course, per-student export tree
    #[serde(default = "defaults::exports_dir")]
    pub exports_dir: PathBuf,

    /// Status log (every line)
    #[serde(default = "defaults::log_file")]
    pub log_file: PathBuf,

    /// Error log (error lines only, replayable)
    #[serde(default = "defaults::err_file")]
    pub err_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            json_dir: defaults::json_dir(),
            exports_dir: defaults::exports_dir(),
            log_file: defaults::log_file(),
            err_file: defaults::err_file(),
        }
    }
}

/// Console logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default console level when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // API defaults
    pub fn base_url() -> String {
        "https://canvas.instructure.com/api/v1/".into()
    }
    pub fn account_id() -> u64 {
        1
    }
    pub fn per_page() -> u32 {
        1000
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; archiver/0.1)".into()
    }

    // Download defaults
    pub fn download_timeout() -> u64 {
        30
    }

    // Path defaults
    pub fn json_dir() -> PathBuf {
        "json".into()
    }
    pub fn exports_dir() -> PathBuf {
        "exports".into()
    }
    pub fn log_file() -> PathBuf {
        "log.txt".into()
    }
    pub fn err_file() -> PathBuf {
        "err.txt".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.api.per_page = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.download.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://lms.example.edu/api/v1/"

            [paths]
            exports_dir = "out"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.per_page, 1000);
        assert_eq!(config.api.account_id, 1);
        assert_eq!(config.download.timeout_secs, 30);
        assert_eq!(config.paths.exports_dir, PathBuf::from("out"));
        assert_eq!(config.paths.err_file, PathBuf::from("err.txt"));
    }
}
