//! Configuration types for the download engine.

use crate::types::Settings;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Top-level engine configuration.
///
/// Deserializes from JSON with every field optional; missing fields take the
/// documented defaults. User-tunable values (concurrency, chunk size, default
/// folder, notifications) only seed the database on first run — after that the
/// persisted [`Settings`] win.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings (default folder, concurrency, chunking)
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// HTTP client settings
    #[serde(flatten)]
    pub http: HttpConfig,

    /// Retry behavior for transient transfer failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Data storage and state management
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

// Convenience accessors — allow call sites to use `config.database_path()` etc.
// without reaching through the sub-config structs.
impl Config {
    /// Path of the SQLite database file
    pub fn database_path(&self) -> &PathBuf {
        &self.persistence.database_path
    }

    /// Settings used to seed the database on first run
    pub fn initial_settings(&self) -> Settings {
        Settings {
            max_concurrent_downloads: self.download.max_concurrent_downloads,
            default_download_folder: self.download.default_download_folder.clone(),
            chunk_size: self.download.chunk_size,
            notifications_enabled: self.download.notifications_enabled,
        }
    }
}

/// Download behavior configuration (default folder, concurrency, chunking)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Default folder for downloaded files (default: "./downloads")
    #[serde(default = "default_download_folder")]
    pub default_download_folder: PathBuf,

    /// Maximum concurrent downloads, 1-10 (default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Size in bytes of individual file writes, 4 KiB - 64 KiB (default: 8192)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Whether completion/failure notifications should be raised (default: true)
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            default_download_folder: default_download_folder(),
            max_concurrent_downloads: default_max_concurrent(),
            chunk_size: default_chunk_size(),
            notifications_enabled: true,
        }
    }
}

/// HTTP client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for establishing a connection (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Persistence configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the SQLite database file (default: "./idm_database.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_download_folder() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent() -> usize {
    3
}

fn default_chunk_size() -> usize {
    8192
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("http-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./idm_database.db")
}

// Duration serialization helper
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
