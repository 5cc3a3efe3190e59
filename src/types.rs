//! Core types shared across the download engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Unique identifier for a download, backed by the SQLite rowid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(pub i64);

impl DownloadId {
    /// Creates a new download ID from a raw i64 value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the inner i64 value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for DownloadId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<DownloadId> for i64 {
    fn from(id: DownloadId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for DownloadId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl PartialEq<DownloadId> for i64 {
    fn eq(&self, other: &DownloadId) -> bool {
        *self == other.0
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DownloadId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

impl sqlx::Type<sqlx::Sqlite> for DownloadId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for DownloadId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <i64 as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for DownloadId {
    fn decode(
        value: sqlx::sqlite::SqliteValueRef<'r>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        <i64 as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value).map(Self)
    }
}

/// Lifecycle state of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting in the queue for a free download slot.
    Queued,
    /// Actively transferring bytes.
    Downloading,
    /// Suspended by the user; partial data is kept for resumption.
    Paused,
    /// Finished successfully; the file is at its final destination.
    Complete,
    /// Stopped after exhausting retries or hitting a fatal error.
    Failed,
    /// Aborted by the user; partial data has been discarded.
    Cancelled,
}

impl Status {
    /// Converts from the integer representation stored in the database.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Status::Queued,
            1 => Status::Downloading,
            2 => Status::Paused,
            3 => Status::Complete,
            4 => Status::Failed,
            5 => Status::Cancelled,
            _ => Status::Failed,
        }
    }

    /// Converts to the integer representation stored in the database.
    pub fn to_i32(&self) -> i32 {
        match self {
            Status::Queued => 0,
            Status::Downloading => 1,
            Status::Paused => 2,
            Status::Complete => 3,
            Status::Failed => 4,
            Status::Cancelled => 5,
        }
    }

    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Complete | Status::Cancelled)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Queued => "queued",
            Status::Downloading => "downloading",
            Status::Paused => "paused",
            Status::Complete => "complete",
            Status::Failed => "failed",
            Status::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// User-tunable engine settings, persisted in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum number of downloads transferring at once (1-10).
    pub max_concurrent_downloads: usize,
    /// Folder that files land in when an add request gives no destination.
    pub default_download_folder: PathBuf,
    /// Size in bytes of individual file writes (4 KiB - 64 KiB).
    pub chunk_size: usize,
    /// Whether completion/failure notifications should be raised by the caller.
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            default_download_folder: PathBuf::from("./downloads"),
            chunk_size: 8192,
            notifications_enabled: true,
        }
    }
}

impl Settings {
    /// Minimum accepted value for `max_concurrent_downloads`.
    pub const MIN_CONCURRENT: usize = 1;
    /// Maximum accepted value for `max_concurrent_downloads`.
    pub const MAX_CONCURRENT: usize = 10;
    /// Minimum accepted value for `chunk_size`.
    pub const MIN_CHUNK_SIZE: usize = 4096;
    /// Maximum accepted value for `chunk_size`.
    pub const MAX_CHUNK_SIZE: usize = 65536;

    /// Checks that every field sits inside its accepted range.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(Self::MIN_CONCURRENT..=Self::MAX_CONCURRENT).contains(&self.max_concurrent_downloads)
        {
            return Err(crate::error::Error::Config {
                message: format!(
                    "max_concurrent_downloads must be between {} and {}, got {}",
                    Self::MIN_CONCURRENT,
                    Self::MAX_CONCURRENT,
                    self.max_concurrent_downloads
                ),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        if !(Self::MIN_CHUNK_SIZE..=Self::MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(crate::error::Error::Config {
                message: format!(
                    "chunk_size must be between {} and {}, got {}",
                    Self::MIN_CHUNK_SIZE,
                    Self::MAX_CHUNK_SIZE,
                    self.chunk_size
                ),
                key: Some("chunk_size".to_string()),
            });
        }
        if self.default_download_folder.as_os_str().is_empty() {
            return Err(crate::error::Error::Config {
                message: "default_download_folder must not be empty".to_string(),
                key: Some("default_download_folder".to_string()),
            });
        }
        Ok(())
    }
}

/// Options accepted when adding a new download.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddOptions {
    /// Folder override; falls back to the default download folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_folder: Option<PathBuf>,
    /// Filename override; falls back to a name derived from the URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Snapshot of a download returned by query operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadInfo {
    /// Download identifier.
    pub id: DownloadId,
    /// Source URL.
    pub url: String,
    /// Display filename.
    pub filename: String,
    /// Final destination path of the file.
    pub destination: PathBuf,
    /// Current lifecycle state.
    pub status: Status,
    /// Expected total size in bytes, when the server reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    /// Bytes written to disk so far.
    pub downloaded_bytes: u64,
    /// Whether the server honors byte-range requests for this URL.
    pub supports_resume: bool,
    /// Most recent measured transfer speed in bytes per second.
    pub speed_bps: u64,
    /// Last recorded error message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation timestamp (unix seconds).
    pub created_at: i64,
    /// Completion timestamp (unix seconds), once complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

/// Aggregate queue counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Downloads waiting for a slot.
    pub queued: usize,
    /// Downloads currently transferring.
    pub active: usize,
    /// Downloads paused by the user.
    pub paused: usize,
    /// Downloads finished successfully.
    pub complete: usize,
    /// Downloads that gave up after errors.
    pub failed: usize,
}

/// Events broadcast by the engine as downloads move through their lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A download was accepted and placed in the queue.
    Queued {
        /// Download identifier.
        id: DownloadId,
        /// Display filename.
        filename: String,
    },
    /// A download acquired a slot and began transferring.
    Started {
        /// Download identifier.
        id: DownloadId,
    },
    /// Periodic progress report for an active download.
    Downloading {
        /// Download identifier.
        id: DownloadId,
        /// Bytes written to disk so far.
        downloaded_bytes: u64,
        /// Expected total size, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        total_bytes: Option<u64>,
        /// Completion percentage (0.0 when the total is unknown).
        percent: f64,
        /// Measured transfer speed in bytes per second.
        speed_bps: u64,
    },
    /// A download was paused.
    Paused {
        /// Download identifier.
        id: DownloadId,
    },
    /// A paused or failed download was placed back in the queue.
    Resumed {
        /// Download identifier.
        id: DownloadId,
    },
    /// A download finished and its file was moved into place.
    Complete {
        /// Download identifier.
        id: DownloadId,
        /// Final path of the downloaded file.
        path: PathBuf,
    },
    /// A download stopped after exhausting retries or a fatal error.
    Failed {
        /// Download identifier.
        id: DownloadId,
        /// Human-readable failure reason.
        error: String,
    },
    /// A download was cancelled and its partial data discarded.
    Cancelled {
        /// Download identifier.
        id: DownloadId,
    },
    /// A download record was removed from the engine.
    Removed {
        /// Download identifier.
        id: DownloadId,
    },
    /// Engine settings changed.
    SettingsChanged {
        /// The settings now in effect.
        settings: Settings,
    },
    /// The engine is shutting down.
    Shutdown,
}
