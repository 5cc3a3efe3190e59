//! Startup and shutdown coordination.

use crate::error::Result;
use crate::types::{DownloadId, Event, Status};

use super::HttpDownloader;

impl HttpDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new downloads
    /// 2. Cancels all active downloads (using their cancellation tokens)
    /// 3. Waits for active downloads to wind down with a timeout (30 seconds)
    /// 4. Marks interrupted downloads as Paused so they resume next session
    /// 5. Records the clean shutdown in the database
    ///
    /// # Errors
    ///
    /// Returns an error if database operations fail during shutdown.
    /// The method will attempt to complete as much of the shutdown sequence as
    /// possible even if some steps fail.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new downloads
        self.queue_state
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);
        tracing::info!("Stopped accepting new downloads");

        // 2. Signal all active downloads to stop; their temp files keep
        // whatever bytes already landed
        self.interrupt_all_active().await;
        tracing::info!("Signaled stop to all active downloads");

        // 3. Wait for active downloads to wind down with timeout
        let shutdown_timeout = std::time::Duration::from_secs(30);
        let wait_result =
            tokio::time::timeout(shutdown_timeout, self.wait_for_active_downloads()).await;

        match wait_result {
            Ok(()) => {
                tracing::info!("All active downloads stopped gracefully");
            }
            Err(_) => {
                tracing::warn!("Timeout waiting for downloads to stop, proceeding with shutdown");
            }
        }

        // 4. Persist final state
        if let Err(e) = self.persist_all_state().await {
            tracing::error!(error = %e, "Failed to persist final state during shutdown");
            // Continue with shutdown even if persistence fails
        } else {
            tracing::info!("Final state persisted to database");
        }

        // 5. Mark clean shutdown in database
        if let Err(e) = self.db.set_clean_shutdown().await {
            tracing::error!(error = %e, "Failed to mark clean shutdown in database");
            // Continue with shutdown even if this fails
        } else {
            tracing::info!("Marked clean shutdown in database");
        }

        // 6. Emit shutdown event
        let _ = self.event_tx.send(Event::Shutdown);

        // 7. Database connections close when the last Arc reference drops;
        // logged here for observability
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Signal every active download to stop via its cancellation token
    pub(crate) async fn interrupt_all_active(&self) {
        let active = self.queue_state.active_downloads.lock().await;
        tracing::debug!(
            active_count = active.len(),
            "Interrupting all active downloads"
        );

        for (id, token) in active.iter() {
            tracing::debug!(download_id = id.0, "Signaling stop");
            token.cancel();
        }
    }

    /// Wait for all active downloads to deregister
    ///
    /// This is a helper method used during shutdown to wait for active
    /// downloads to finish winding down before closing.
    async fn wait_for_active_downloads(&self) {
        loop {
            let active_count = {
                let active = self.queue_state.active_downloads.lock().await;
                active.len()
            };

            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for active downloads to stop");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }

    /// Persist all state to the database
    ///
    /// Downloads still marked Downloading but no longer running were
    /// interrupted by the shutdown; mark them Paused so the next session
    /// resumes them from their temp files. Everything else is already
    /// persisted - every transition writes to the database before it becomes
    /// visible.
    pub(crate) async fn persist_all_state(&self) -> Result<()> {
        tracing::debug!("Persisting all state to database");

        let downloads = self.db.list_downloads().await?;

        let mut persisted_count = 0;
        for download in downloads {
            let is_active = {
                let active = self.queue_state.active_downloads.lock().await;
                active.contains_key(&DownloadId(download.id))
            };

            if !is_active && download.status == Status::Downloading.to_i32() {
                self.db
                    .update_status(DownloadId(download.id), Status::Paused.to_i32())
                    .await?;
                persisted_count += 1;
                tracing::debug!(
                    download_id = download.id,
                    "Marked interrupted download as Paused for resume on restart"
                );
            }
        }

        if persisted_count > 0 {
            tracing::info!(
                persisted_count,
                "Persisted state for {} interrupted download(s)",
                persisted_count
            );
        } else {
            tracing::debug!("All download states already persisted");
        }

        Ok(())
    }
}
