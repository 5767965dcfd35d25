//! Configuration types for report-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Download behavior configuration (directories, concurrency, HTTP client)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root directory; one sub-directory per report year is created beneath it (default: ".")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum number of items in the transfer phase at once (default: 10)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Maximum number of item pipelines dispatched at once (default: 64)
    ///
    /// Bounds splash-page fetches; transfers are bounded separately by
    /// `max_concurrent_downloads`.
    #[serde(default = "default_max_pending_items")]
    pub max_pending_items: usize,

    /// Total timeout for a single HTTP request, body included (default: 300s)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// TCP/TLS connect timeout (default: 30s)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            max_pending_items: default_max_pending_items(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Remote endpoints: the metadata catalog and the Box download endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// JSON catalog of report records
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Endpoint that serves shared files once the shared name and item id are known
    #[serde(default = "default_download_endpoint")]
    pub download_endpoint: String,

    /// Process the catalog newest-first (the catalog is published oldest-first)
    #[serde(default = "default_true")]
    pub newest_first: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            download_endpoint: default_download_endpoint(),
            newest_first: true,
        }
    }
}

/// Main configuration for [`crate::ReportDownloader`]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Remote endpoints
    #[serde(default)]
    pub source: SourceConfig,
}

impl Config {
    /// Load a configuration from a JSON file; omitted fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the downloader cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(config_error(
                "max_concurrent_downloads must be at least 1",
                "max_concurrent_downloads",
            ));
        }
        if self.download.max_pending_items == 0 {
            return Err(config_error(
                "max_pending_items must be at least 1",
                "max_pending_items",
            ));
        }
        for (key, value) in [
            ("catalog_url", &self.source.catalog_url),
            ("download_endpoint", &self.source.download_endpoint),
        ] {
            url::Url::parse(value)
                .map_err(|e| config_error(format!("{key} is not a valid URL: {e}"), key))?;
        }
        Ok(())
    }

    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_concurrent() -> usize {
    10
}

fn default_max_pending_items() -> usize {
    64
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("report-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_catalog_url() -> String {
    "https://raw.githubusercontent.com/aptnotes/data/master/APTnotes.json".to_string()
}

fn default_download_endpoint() -> String {
    "https://app.box.com/index.php".to_string()
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
