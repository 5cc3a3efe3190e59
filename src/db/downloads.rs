//! Download queue CRUD operations.

use crate::error::DatabaseError;
use crate::types::DownloadId;
use crate::{Error, Result};

use super::{Database, Download, NewDownload};

/// Column list shared by every SELECT on the downloads table
const DOWNLOAD_COLUMNS: &str = r#"
    id, url, filename, destination, status,
    total_bytes, downloaded_bytes, supports_resume, speed_bps,
    error_message, created_at, updated_at, completed_at
"#;

impl Database {
    /// Insert a new download record
    pub async fn insert_download(&self, download: &NewDownload) -> Result<DownloadId> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO downloads (
                url, filename, destination, status, total_bytes,
                downloaded_bytes, supports_resume, speed_bps,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&download.url)
        .bind(&download.filename)
        .bind(&download.destination)
        .bind(download.status)
        .bind(download.total_bytes)
        .bind(0i64) // downloaded_bytes
        .bind(0i32) // supports_resume
        .bind(0i64) // speed_bps
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert download: {}",
                e
            )))
        })?;

        Ok(DownloadId(result.last_insert_rowid()))
    }

    /// Get a download by ID
    pub async fn get_download(&self, id: DownloadId) -> Result<Option<Download>> {
        let row = sqlx::query_as::<_, Download>(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get download: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// List all downloads in insertion order
    pub async fn list_downloads(&self) -> Result<Vec<Download>> {
        let rows = sqlx::query_as::<_, Download>(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list downloads: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// List downloads with a specific status
    pub async fn list_downloads_by_status(&self, status: i32) -> Result<Vec<Download>> {
        let rows = sqlx::query_as::<_, Download>(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE status = ? ORDER BY created_at ASC, id ASC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list downloads by status: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Find a non-terminal download targeting the given destination path
    pub async fn find_active_by_destination(
        &self,
        destination: &str,
    ) -> Result<Option<Download>> {
        let row = sqlx::query_as::<_, Download>(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE destination = ? AND status NOT IN (3, 5) LIMIT 1"
        ))
        .bind(destination)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to query destination: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Update download status
    pub async fn update_status(&self, id: DownloadId, status: i32) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE downloads SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update status: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Update download progress counters
    pub async fn update_progress(
        &self,
        id: DownloadId,
        downloaded_bytes: u64,
        speed_bps: u64,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "UPDATE downloads SET downloaded_bytes = ?, speed_bps = ?, updated_at = ? WHERE id = ?",
        )
        .bind(downloaded_bytes as i64)
        .bind(speed_bps as i64)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update progress: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Record the server-reported total size
    pub async fn set_total_bytes(&self, id: DownloadId, total_bytes: Option<u64>) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE downloads SET total_bytes = ?, updated_at = ? WHERE id = ?")
            .bind(total_bytes.map(|t| t as i64))
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set total bytes: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Record whether the server honors byte-range requests
    pub async fn set_supports_resume(&self, id: DownloadId, supports_resume: bool) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE downloads SET supports_resume = ?, updated_at = ? WHERE id = ?")
            .bind(if supports_resume { 1i32 } else { 0i32 })
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set resume support: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Update the display filename (e.g. after a Content-Disposition header)
    pub async fn set_filename(&self, id: DownloadId, filename: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE downloads SET filename = ?, updated_at = ? WHERE id = ?")
            .bind(filename)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set filename: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Set download error message
    pub async fn set_error(&self, id: DownloadId, error: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE downloads SET error_message = ?, updated_at = ? WHERE id = ?")
            .bind(error)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set error: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Clear any recorded error message
    pub async fn clear_error(&self, id: DownloadId) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE downloads SET error_message = NULL, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to clear error: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Mark a download complete in a single durable write
    pub async fn set_completed(&self, id: DownloadId, downloaded_bytes: u64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            UPDATE downloads
            SET status = 3, downloaded_bytes = ?, speed_bps = 0,
                error_message = NULL, completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(downloaded_bytes as i64)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark download complete: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Delete a download
    pub async fn delete_download(&self, id: DownloadId) -> Result<()> {
        sqlx::query("DELETE FROM downloads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete download: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Get queued and in-flight downloads (for queue restoration on startup)
    pub async fn get_incomplete_downloads(&self) -> Result<Vec<Download>> {
        let rows = sqlx::query_as::<_, Download>(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE status IN (0, 1) ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get incomplete downloads: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
