//! Runtime settings updates.

use crate::error::Result;
use crate::types::{Event, Settings};

use super::HttpDownloader;

impl HttpDownloader {
    /// Get the current settings
    ///
    /// Returns a clone of the settings currently in effect. Settings are
    /// persisted in the database, so they survive restarts.
    pub async fn get_settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Replace the current settings
    ///
    /// Validates the new settings, persists them, and applies them to the
    /// running engine:
    /// - A raised `max_concurrent_downloads` immediately opens slots for
    ///   waiting downloads
    /// - A lowered limit only throttles future admissions; transfers already
    ///   running are never stopped
    /// - `chunk_size` and `default_download_folder` apply to downloads started
    ///   after the change
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Config`] if any field is out of range;
    /// nothing is persisted or applied in that case.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use http_dl::*;
    /// # async fn example(downloader: HttpDownloader) -> Result<()> {
    /// let mut settings = downloader.get_settings().await;
    /// settings.max_concurrent_downloads = 5;
    /// downloader.update_settings(settings).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn update_settings(&self, new_settings: Settings) -> Result<()> {
        new_settings.validate()?;

        // Persist before applying: a crash mid-update must not leave the
        // database behind the running state
        self.db.save_settings(&new_settings).await?;

        let old_limit = {
            let mut settings = self.settings.write().await;
            let old_limit = settings.max_concurrent_downloads;
            *settings = new_settings.clone();
            old_limit
        };

        self.resize_concurrency(old_limit, new_settings.max_concurrent_downloads);

        tracing::info!(
            max_concurrent = new_settings.max_concurrent_downloads,
            chunk_size = new_settings.chunk_size,
            folder = %new_settings.default_download_folder.display(),
            "Settings updated"
        );

        self.emit_event(Event::SettingsChanged {
            settings: new_settings,
        });

        Ok(())
    }

    /// Grow or shrink the admission semaphore to a new concurrency limit.
    fn resize_concurrency(&self, old_limit: usize, new_limit: usize) {
        use std::cmp::Ordering;

        match new_limit.cmp(&old_limit) {
            Ordering::Greater => {
                self.queue_state
                    .concurrent_limit
                    .add_permits(new_limit - old_limit);
            }
            Ordering::Less => {
                // Permits can't be revoked from running transfers. Acquire the
                // surplus as transfers release their permits and forget them,
                // shrinking the effective limit without evicting anyone.
                let surplus = (old_limit - new_limit) as u32;
                let semaphore = self.queue_state.concurrent_limit.clone();
                tokio::spawn(async move {
                    match semaphore.acquire_many_owned(surplus).await {
                        Ok(permits) => permits.forget(),
                        Err(_) => {
                            // Semaphore closed during shutdown; nothing to shrink
                        }
                    }
                });
            }
            Ordering::Equal => {}
        }
    }
}
