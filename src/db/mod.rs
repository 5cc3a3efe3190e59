//! Database layer for the download engine
//!
//! Handles SQLite persistence for downloads, settings, and runtime state.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`downloads`] — Download queue CRUD
//! - [`settings`] — Persisted user settings
//! - [`state`] — Runtime state (shutdown tracking)

use sqlx::{FromRow, sqlite::SqlitePool};

mod downloads;
mod migrations;
mod settings;
mod state;

/// New download to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewDownload {
    /// Source URL
    pub url: String,
    /// Display filename
    pub filename: String,
    /// Final destination path on disk
    pub destination: String,
    /// Current status (0=queued, 1=downloading, 2=paused, etc.)
    pub status: i32,
    /// Total size in bytes, when known ahead of time
    pub total_bytes: Option<i64>,
}

/// Download record from database
#[derive(Debug, Clone, FromRow)]
pub struct Download {
    /// Unique database ID
    pub id: i64,
    /// Source URL
    pub url: String,
    /// Display filename
    pub filename: String,
    /// Final destination path on disk
    pub destination: String,
    /// Current status (0=queued, 1=downloading, 2=paused, etc.)
    pub status: i32,
    /// Total size in bytes as reported by the server (NULL until probed)
    pub total_bytes: Option<i64>,
    /// Number of bytes written to disk so far
    pub downloaded_bytes: i64,
    /// Whether the server honors byte-range requests (0 = no, 1 = yes)
    pub supports_resume: i32,
    /// Current download speed in bytes per second
    pub speed_bps: i64,
    /// Error message if download failed
    pub error_message: Option<String>,
    /// Unix timestamp when download was created
    pub created_at: i64,
    /// Unix timestamp of the last update to this row
    pub updated_at: i64,
    /// Unix timestamp when download completed
    pub completed_at: Option<i64>,
}

/// Database handle for the download engine
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
