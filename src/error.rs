//! Error types for the download engine.
//!
//! The error tree mirrors the layers of the engine: database access,
//! lifecycle/control operations, and the transfer pipeline each have their own
//! enum, all folded into the top-level [`Error`].

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the download engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "chunk_size")
        key: Option<String>,
    },

    /// Database-level error
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Raw sqlx error that escaped a database helper
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Download lifecycle error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Transfer pipeline error
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// HTTP client error (connect failures, timeouts, broken streams)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The given string is not a usable http/https URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Filesystem error outside the write path of an active transfer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The engine is shutting down and no longer accepts work
    #[error("engine is shutting down")]
    ShuttingDown,
}

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create the database file
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// A schema migration did not apply cleanly
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// A query failed to execute
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Errors raised by lifecycle and control operations.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// No download with the given ID exists
    #[error("download {id} not found")]
    NotFound {
        /// The missing download ID
        id: i64,
    },

    /// The operation is not valid from the download's current state
    #[error("cannot {operation} download {id} in state {current_state}")]
    InvalidState {
        /// Download ID
        id: i64,
        /// The attempted operation (e.g., "pause", "resume")
        operation: String,
        /// The download's current state
        current_state: String,
    },

    /// Another non-terminal download already targets the same destination path
    #[error("destination already in use: {path}")]
    DuplicateDestination {
        /// The contested destination path
        path: String,
    },
}

/// Errors raised by the transfer pipeline.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The server answered with a non-success status
    #[error("server rejected request with status {status}")]
    ServerRejection {
        /// The HTTP status code returned
        status: u16,
    },

    /// The server did not honor a byte-range request
    #[error("server does not support byte ranges")]
    RangeNotSupported,

    /// Writing or flushing the temp file failed
    #[error("disk write failed: {0}")]
    Disk(String),

    /// The byte count on disk does not match the server-reported size
    #[error("size mismatch: expected {expected} bytes, received {actual}")]
    IntegrityMismatch {
        /// Bytes the server said the file contains
        expected: u64,
        /// Bytes actually written to disk
        actual: u64,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_includes_message() {
        let err = Error::Config {
            message: "chunk_size must be between 4096 and 65536, got 1".to_string(),
            key: Some("chunk_size".to_string()),
        };
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn database_error_converts_to_top_level() {
        let err: Error = DatabaseError::QueryFailed("boom".to_string()).into();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn invalid_state_display_names_the_operation() {
        let err = DownloadError::InvalidState {
            id: 3,
            operation: "pause".to_string(),
            current_state: "Complete".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pause"));
        assert!(msg.contains("Complete"));
    }

    #[test]
    fn integrity_mismatch_reports_both_counts() {
        let err = TransferError::IntegrityMismatch {
            expected: 1000,
            actual: 999,
        };
        let msg = err.to_string();
        assert!(msg.contains("1000"));
        assert!(msg.contains("999"));
    }

    #[test]
    fn io_error_converts_to_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
