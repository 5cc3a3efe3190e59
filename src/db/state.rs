//! Runtime state tracking: shutdown detection.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::Database;

impl Database {
    /// Check if the last shutdown was unclean
    ///
    /// Returns true if the previous session did not call set_clean_shutdown(),
    /// indicating a crash or forced termination.
    ///
    /// This method is called on startup to determine if state recovery is needed.
    pub async fn was_unclean_shutdown(&self) -> Result<bool> {
        let value: Option<String> = sqlx::query_scalar(
            r#"
            SELECT value FROM runtime_state WHERE key = 'clean_shutdown'
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to check shutdown state: {}",
                e
            )))
        })?;

        // If the value is missing or "false", it was an unclean shutdown
        Ok(value.is_none_or(|v| v != "true"))
    }

    /// Mark that the application has started cleanly
    ///
    /// This should be called during HttpDownloader::new() to indicate that
    /// the application is running. If shutdown() is not called before the next
    /// startup, was_unclean_shutdown() will return true.
    pub async fn set_clean_start(&self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO runtime_state (key, value, updated_at)
            VALUES ('clean_shutdown', 'false', ?)
            ON CONFLICT(key) DO UPDATE SET value = 'false', updated_at = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to set clean start: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Mark that the application is shutting down cleanly
    ///
    /// This should be called during HttpDownloader::shutdown() to indicate
    /// a graceful shutdown. If this is not called before the process exits,
    /// the next startup will detect an unclean shutdown.
    pub async fn set_clean_shutdown(&self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO runtime_state (key, value, updated_at)
            VALUES ('clean_shutdown', 'true', ?)
            ON CONFLICT(key) DO UPDATE SET value = 'true', updated_at = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to set clean shutdown: {}",
                e
            )))
        })?;

        Ok(())
    }
}
