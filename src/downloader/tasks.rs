//! Adding, querying, and removing downloads.

use crate::db::{Download, NewDownload};
use crate::error::{DownloadError, Error, Result};
use crate::types::{AddOptions, DownloadId, DownloadInfo, Event, QueueStats, Status};
use crate::utils;
use std::path::PathBuf;

use super::HttpDownloader;

/// Convert a database row into the public snapshot type
pub(crate) fn info_from_row(row: Download) -> DownloadInfo {
    DownloadInfo {
        id: DownloadId(row.id),
        url: row.url,
        filename: row.filename,
        destination: PathBuf::from(row.destination),
        status: Status::from_i32(row.status),
        total_bytes: row.total_bytes.map(|t| t as u64),
        downloaded_bytes: row.downloaded_bytes as u64,
        supports_resume: row.supports_resume != 0,
        speed_bps: row.speed_bps as u64,
        error_message: row.error_message,
        created_at: row.created_at,
        completed_at: row.completed_at,
    }
}

impl HttpDownloader {
    /// Add a new download
    ///
    /// Validates the URL, resolves the target filename and destination folder,
    /// persists the download in Queued state, and places it at the back of the
    /// FIFO queue. The queue processor picks it up when a slot frees up.
    ///
    /// The filename falls back to the last URL path segment when no override is
    /// given; the destination folder falls back to the configured default.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] when the URL is not a usable http/https URL
    /// - [`DownloadError::DuplicateDestination`] when another non-terminal
    ///   download already targets the same file
    /// - [`Error::ShuttingDown`] when the engine no longer accepts work
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use http_dl::*;
    /// # use http_dl::types::AddOptions;
    /// # async fn example(downloader: HttpDownloader) -> Result<()> {
    /// let id = downloader
    ///     .add("https://example.com/file.zip", AddOptions::default())
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn add(&self, url: &str, options: AddOptions) -> Result<DownloadId> {
        if !self
            .queue_state
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(Error::ShuttingDown);
        }

        utils::validate_url(url)?;

        let filename = options
            .filename
            .unwrap_or_else(|| utils::filename_from_url(url));

        let folder = match options.destination_folder {
            Some(folder) => folder,
            None => self.settings.read().await.default_download_folder.clone(),
        };

        tokio::fs::create_dir_all(&folder).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create destination folder '{}': {}",
                    folder.display(),
                    e
                ),
            ))
        })?;

        let destination = folder.join(&filename);
        let destination_str = destination.to_string_lossy().to_string();

        // Two downloads writing the same file would corrupt each other
        if self
            .db
            .find_active_by_destination(&destination_str)
            .await?
            .is_some()
        {
            return Err(Error::Download(DownloadError::DuplicateDestination {
                path: destination_str,
            }));
        }

        let id = self
            .db
            .insert_download(&NewDownload {
                url: url.to_string(),
                filename: filename.clone(),
                destination: destination_str,
                status: Status::Queued.to_i32(),
                total_bytes: None,
            })
            .await?;

        self.add_to_queue(id).await?;

        tracing::info!(download_id = id.0, url, filename, "Download added");
        self.emit_event(Event::Queued { id, filename });

        Ok(id)
    }

    /// Get a snapshot of a single download
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::NotFound`] if no download with the ID exists.
    pub async fn get(&self, id: DownloadId) -> Result<DownloadInfo> {
        let row = self
            .db
            .get_download(id)
            .await?
            .ok_or(Error::Download(DownloadError::NotFound { id: id.0 }))?;

        Ok(info_from_row(row))
    }

    /// List all downloads in insertion order
    pub async fn list(&self) -> Result<Vec<DownloadInfo>> {
        let rows = self.db.list_downloads().await?;
        Ok(rows.into_iter().map(info_from_row).collect())
    }

    /// Aggregate counters over all downloads
    pub async fn queue_stats(&self) -> Result<QueueStats> {
        let rows = self.db.list_downloads().await?;

        let mut stats = QueueStats::default();
        for row in rows {
            match Status::from_i32(row.status) {
                Status::Queued => stats.queued += 1,
                Status::Downloading => stats.active += 1,
                Status::Paused => stats.paused += 1,
                Status::Complete => stats.complete += 1,
                Status::Failed => stats.failed += 1,
                Status::Cancelled => {}
            }
        }

        Ok(stats)
    }

    /// Remove a download from the engine entirely
    ///
    /// Stops the download if it is running, deletes its partial temp file, and
    /// deletes the database row. Completed files at the final destination are
    /// left alone.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use http_dl::*;
    /// # async fn example(downloader: HttpDownloader, id: DownloadId) -> Result<()> {
    /// downloader.remove(id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn remove(&self, id: DownloadId) -> Result<()> {
        let download = self
            .db
            .get_download(id)
            .await?
            .ok_or(Error::Download(DownloadError::NotFound { id: id.0 }))?;

        // If the download is actively running, stop its task
        let mut active_downloads = self.queue_state.active_downloads.lock().await;
        if let Some(cancel_token) = active_downloads.get(&id) {
            cancel_token.cancel();
            active_downloads.remove(&id);
        }
        drop(active_downloads); // Release lock

        // Remove from queue if it's still waiting (not yet started)
        self.remove_from_queue(id).await;

        // Delete the partial temp file, if any
        let temp = utils::temp_path(std::path::Path::new(&download.destination));
        if let Err(e) = tokio::fs::remove_file(&temp).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(
                download_id = id.0,
                path = %temp.display(),
                error = %e,
                "Failed to delete temp file"
            );
            // Continue anyway - database deletion is more important
        }

        self.db.delete_download(id).await?;

        self.emit_event(Event::Removed { id });

        Ok(())
    }
}
