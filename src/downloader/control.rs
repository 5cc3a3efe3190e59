//! Download lifecycle control — pause, resume, retry, cancel.

use crate::error::{DownloadError, Error, Result};
use crate::types::{DownloadId, Event, Status};
use crate::utils;

use super::HttpDownloader;

impl HttpDownloader {
    /// Pause a download
    ///
    /// If the download is currently transferring, its task is stopped and the
    /// partial temp file is kept on disk so the transfer can pick up where it
    /// left off. Pausing an already-paused download is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidState`] if the download is Complete,
    /// Failed, or Cancelled, and [`DownloadError::NotFound`] if it doesn't exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use http_dl::*;
    /// # async fn example(downloader: HttpDownloader, id: DownloadId) -> Result<()> {
    /// downloader.pause(id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn pause(&self, id: DownloadId) -> Result<()> {
        let download = self
            .db
            .get_download(id)
            .await?
            .ok_or(Error::Download(DownloadError::NotFound { id: id.0 }))?;

        let current_status = Status::from_i32(download.status);

        match current_status {
            Status::Paused => {
                // Already paused, nothing to do
                return Ok(());
            }
            Status::Complete | Status::Failed | Status::Cancelled => {
                return Err(Error::Download(DownloadError::InvalidState {
                    id: id.0,
                    operation: "pause".to_string(),
                    current_state: format!("{:?}", current_status),
                }));
            }
            Status::Queued | Status::Downloading => {
                // Can be paused
            }
        }

        // If download is actively running, cancel its task
        let mut active_downloads = self.queue_state.active_downloads.lock().await;
        if let Some(cancel_token) = active_downloads.get(&id) {
            // Signal the download task to stop
            cancel_token.cancel();
            // Remove from active downloads (task will clean up)
            active_downloads.remove(&id);
        }
        drop(active_downloads); // Release lock

        // Remove from queue if it's still queued (not yet started)
        self.remove_from_queue(id).await;

        self.db.update_status(id, Status::Paused.to_i32()).await?;

        tracing::info!(download_id = id.0, "Download paused");
        self.emit_event(Event::Paused { id });

        Ok(())
    }

    /// Resume a paused download
    ///
    /// Moves the download back to Queued and places it at the back of the FIFO
    /// queue. The queue processor picks it up when a slot frees up; if the
    /// server supports ranges the transfer continues from the bytes already in
    /// the temp file. Resuming a download that is already queued or
    /// transferring is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidState`] if the download is Complete,
    /// Failed, or Cancelled (use [`HttpDownloader::retry`] for failed
    /// downloads), and [`DownloadError::NotFound`] if it doesn't exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use http_dl::*;
    /// # async fn example(downloader: HttpDownloader, id: DownloadId) -> Result<()> {
    /// downloader.resume(id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn resume(&self, id: DownloadId) -> Result<()> {
        let download = self
            .db
            .get_download(id)
            .await?
            .ok_or(Error::Download(DownloadError::NotFound { id: id.0 }))?;

        let current_status = Status::from_i32(download.status);

        match current_status {
            Status::Paused => {
                // Can be resumed
            }
            Status::Queued | Status::Downloading => {
                // Already active, nothing to do (idempotent)
                return Ok(());
            }
            Status::Complete | Status::Failed | Status::Cancelled => {
                return Err(Error::Download(DownloadError::InvalidState {
                    id: id.0,
                    operation: "resume".to_string(),
                    current_state: format!("{:?}", current_status),
                }));
            }
        }

        self.db.update_status(id, Status::Queued.to_i32()).await?;

        // Add back to the FIFO queue; the queue processor picks it up
        self.add_to_queue(id).await?;

        tracing::info!(download_id = id.0, "Download resumed");
        self.emit_event(Event::Resumed { id });

        Ok(())
    }

    /// Retry a failed download
    ///
    /// Clears the recorded error, moves the download back to Queued, and places
    /// it at the back of the FIFO queue. Partial temp data from the failed
    /// attempt is kept and reused when the server supports ranges.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidState`] if the download is not in the
    /// Failed state, and [`DownloadError::NotFound`] if it doesn't exist.
    pub async fn retry(&self, id: DownloadId) -> Result<()> {
        let download = self
            .db
            .get_download(id)
            .await?
            .ok_or(Error::Download(DownloadError::NotFound { id: id.0 }))?;

        let current_status = Status::from_i32(download.status);

        if current_status != Status::Failed {
            return Err(Error::Download(DownloadError::InvalidState {
                id: id.0,
                operation: "retry".to_string(),
                current_state: format!("{:?}", current_status),
            }));
        }

        self.db.clear_error(id).await?;
        self.db.update_status(id, Status::Queued.to_i32()).await?;

        self.add_to_queue(id).await?;

        tracing::info!(download_id = id.0, "Failed download re-queued");
        self.emit_event(Event::Resumed { id });

        Ok(())
    }

    /// Cancel a download and discard its partial data
    ///
    /// Stops the download if it is running, removes it from the queue, deletes
    /// the partial temp file, and marks the download Cancelled. The database
    /// row is kept so the cancellation shows up in listings; use
    /// [`HttpDownloader::remove`] to delete the record entirely.
    ///
    /// Cancelled is terminal: the download cannot be resumed or retried.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidState`] if the download is already
    /// Complete or Cancelled, and [`DownloadError::NotFound`] if it doesn't
    /// exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use http_dl::*;
    /// # async fn example(downloader: HttpDownloader, id: DownloadId) -> Result<()> {
    /// downloader.cancel(id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn cancel(&self, id: DownloadId) -> Result<()> {
        let download = self
            .db
            .get_download(id)
            .await?
            .ok_or(Error::Download(DownloadError::NotFound { id: id.0 }))?;

        let current_status = Status::from_i32(download.status);

        if current_status.is_terminal() {
            return Err(Error::Download(DownloadError::InvalidState {
                id: id.0,
                operation: "cancel".to_string(),
                current_state: format!("{:?}", current_status),
            }));
        }

        // If download is actively running, cancel its task
        let mut active_downloads = self.queue_state.active_downloads.lock().await;
        if let Some(cancel_token) = active_downloads.get(&id) {
            cancel_token.cancel();
            active_downloads.remove(&id);
        }
        drop(active_downloads); // Release lock

        // Remove from queue if it's still queued (not yet started)
        self.remove_from_queue(id).await;

        // Discard the partial temp file
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
        }

        self.db
            .update_status(id, Status::Cancelled.to_i32())
            .await?;

        tracing::info!(download_id = id.0, "Download cancelled");
        self.emit_event(Event::Cancelled { id });

        Ok(())
    }

    /// Pause all active downloads
    ///
    /// Pauses every download that is currently queued or transferring.
    /// Paused, completed, failed, and cancelled downloads are not affected.
    pub async fn pause_all(&self) -> Result<()> {
        let all_downloads = self.db.list_downloads().await?;

        let mut paused_count = 0;

        for download in all_downloads {
            let status = Status::from_i32(download.status);

            match status {
                Status::Queued | Status::Downloading => {
                    if let Err(e) = self.pause(DownloadId(download.id)).await {
                        tracing::warn!(
                            download_id = download.id,
                            error = %e,
                            "Failed to pause download during pause_all"
                        );
                        // Continue with other downloads
                    } else {
                        paused_count += 1;
                    }
                }
                Status::Paused | Status::Complete | Status::Failed | Status::Cancelled => {
                    // Skip already paused/finished downloads
                }
            }
        }

        tracing::info!(paused_count = paused_count, "Paused all active downloads");

        Ok(())
    }

    /// Resume all paused downloads
    ///
    /// Resumes every download that is currently paused. Downloads in other
    /// states are not affected.
    pub async fn resume_all(&self) -> Result<()> {
        let paused_downloads = self
            .db
            .list_downloads_by_status(Status::Paused.to_i32())
            .await?;

        let mut resumed_count = 0;

        for download in paused_downloads {
            if let Err(e) = self.resume(DownloadId(download.id)).await {
                tracing::warn!(
                    download_id = download.id,
                    error = %e,
                    "Failed to resume download during resume_all"
                );
                // Continue with other downloads
            } else {
                resumed_count += 1;
            }
        }

        tracing::info!(
            resumed_count = resumed_count,
            "Resumed all paused downloads"
        );

        Ok(())
    }
}
