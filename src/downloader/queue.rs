//! FIFO queue management for download ordering.

use crate::error::{DownloadError, Error, Result};
use crate::types::{DownloadId, Status};

use super::{HttpDownloader, QueuedDownload};

impl HttpDownloader {
    /// Add a download to the in-memory FIFO queue
    ///
    /// Downloads are admitted strictly in the order they were enqueued; there is
    /// no priority dimension.
    ///
    /// # Errors
    ///
    /// Returns an error if the download doesn't exist in the database
    pub(crate) async fn add_to_queue(&self, id: DownloadId) -> Result<()> {
        // Fetch download from database to get created_at
        let download = self
            .db
            .get_download(id)
            .await?
            .ok_or(Error::Download(DownloadError::NotFound { id: id.0 }))?;

        let queued_download = QueuedDownload {
            id,
            created_at: download.created_at,
        };

        let mut queue = self.queue_state.queue.lock().await;
        queue.push_back(queued_download);

        Ok(())
    }

    /// Remove a download from the in-memory FIFO queue
    ///
    /// Used when a queued download is paused, cancelled, or removed before it
    /// acquires a slot.
    ///
    /// # Returns
    ///
    /// Returns true if the download was found and removed, false otherwise
    pub(crate) async fn remove_from_queue(&self, id: DownloadId) -> bool {
        let mut queue = self.queue_state.queue.lock().await;

        let original_len = queue.len();
        queue.retain(|item| item.id != id);

        queue.len() < original_len
    }

    /// Restore incomplete downloads from database on startup
    ///
    /// This method is called automatically during initialization to restore
    /// any downloads that were waiting or in progress when the application
    /// last shut down.
    ///
    /// The restoration process:
    /// 1. Queries the database for downloads with status Queued or Downloading
    /// 2. Downloads in Downloading state are reset to Queued (their transfer was
    ///    interrupted; the temp file keeps whatever bytes already landed)
    /// 3. All of them are re-added to the FIFO queue in creation order
    ///
    /// Complete, Failed, and Cancelled downloads are not restored. Paused
    /// downloads are also not restored (the user explicitly paused them).
    pub async fn restore_queue(&self) -> Result<()> {
        tracing::info!("Restoring queue from database");

        let incomplete_downloads = self.db.get_incomplete_downloads().await?;

        if incomplete_downloads.is_empty() {
            tracing::info!("No incomplete downloads to restore");
            return Ok(());
        }

        tracing::info!(
            count = incomplete_downloads.len(),
            "Found incomplete downloads to restore"
        );

        let restore_count = incomplete_downloads.len();

        for download in incomplete_downloads {
            let id = DownloadId(download.id);
            let status = Status::from_i32(download.status);

            match status {
                Status::Downloading => {
                    // Was actively transferring when the process died - re-queue it.
                    // The transfer picks up from the temp file when the server
                    // supports ranges.
                    tracing::info!(download_id = download.id, "Re-queueing interrupted download");
                    self.db.update_status(id, Status::Queued.to_i32()).await?;
                    self.add_to_queue(id).await?;
                }
                Status::Queued => {
                    tracing::info!(
                        download_id = download.id,
                        "Re-adding queued download to queue"
                    );
                    self.add_to_queue(id).await?;
                }
                _ => {
                    // Shouldn't happen (get_incomplete_downloads filters by status)
                    tracing::warn!(
                        download_id = download.id,
                        status = ?status,
                        "Unexpected download status during restore - skipping"
                    );
                }
            }
        }

        tracing::info!(restored_count = restore_count, "Queue restoration complete");

        Ok(())
    }
}
