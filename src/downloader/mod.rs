//! Core downloader implementation split into focused submodules.
//!
//! The `HttpDownloader` struct and its methods are organized by domain:
//! - [`queue`] - FIFO queue management
//! - [`control`] - Download lifecycle control (pause/resume/retry/cancel)
//! - [`settings_ops`] - Runtime settings updates
//! - [`lifecycle`] - Startup and shutdown coordination
//! - [`tasks`] - Adding, querying, and removing downloads
//! - [`queue_processor`] - Queue processing and orchestration
//! - [`download_task`] - Core download execution
//! - [`progress`] - Periodic progress reporting

mod control;
mod download_task;
mod lifecycle;
mod progress;
mod queue;
mod queue_processor;
mod settings_ops;
mod tasks;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::DownloadId;

/// Queue and download state management
#[derive(Clone)]
pub(crate) struct QueueState {
    /// FIFO queue of downloads waiting for a free slot (protected by Mutex)
    pub(crate) queue:
        std::sync::Arc<tokio::sync::Mutex<std::collections::VecDeque<QueuedDownload>>>,
    /// Semaphore to limit concurrent downloads (respects max_concurrent_downloads)
    pub(crate) concurrent_limit: std::sync::Arc<tokio::sync::Semaphore>,
    /// Map of active downloads to their cancellation tokens (for pause/cancel operations)
    pub(crate) active_downloads: std::sync::Arc<
        tokio::sync::Mutex<
            std::collections::HashMap<DownloadId, tokio_util::sync::CancellationToken>,
        >,
    >,
    /// Flag to indicate whether new downloads are accepted (set to false during shutdown)
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct HttpDownloader {
    /// Database instance for persistence (wrapped in Arc for sharing across tasks)
    /// Public for integration tests to query download status
    pub db: std::sync::Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<crate::types::Event>,
    /// Static configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: std::sync::Arc<Config>,
    /// Shared HTTP client (reqwest clients hold an internal connection pool)
    pub(crate) client: reqwest::Client,
    /// Runtime-mutable settings, seeded from the database on startup
    pub(crate) settings: std::sync::Arc<tokio::sync::RwLock<crate::types::Settings>>,
    /// Queue and download state management
    pub(crate) queue_state: QueueState,
}

/// Internal struct representing a download waiting in the FIFO queue
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct QueuedDownload {
    pub(crate) id: DownloadId,
    pub(crate) created_at: i64, // Unix timestamp, informational
}

impl HttpDownloader {
    /// Create a new HttpDownloader instance
    ///
    /// This initializes all core components:
    /// - Opens/creates the SQLite database and runs migrations
    /// - Loads persisted settings (seeding them from config on first run)
    /// - Builds the shared HTTP client
    /// - Sets up the event broadcast channel
    /// - Re-queues downloads interrupted in a previous session
    pub async fn new(config: Config) -> Result<Self> {
        // Ensure the default download folder exists
        tokio::fs::create_dir_all(&config.download.default_download_folder)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download folder '{}': {}",
                        config.download.default_download_folder.display(),
                        e
                    ),
                ))
            })?;

        // Initialize database
        let db = Database::new(config.database_path()).await?;

        if db.was_unclean_shutdown().await? {
            tracing::warn!("Previous session did not shut down cleanly");
        }

        // Mark that we're starting up (for unclean shutdown detection)
        db.set_clean_start().await?;

        // Load persisted settings; the config values only seed the first run
        let settings = db.load_settings(&config.initial_settings()).await?;

        // Create broadcast channel with buffer size of 1000 events
        // This allows multiple subscribers to receive all events independently
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        // Shared HTTP client used for probes and transfers
        let client = reqwest::Client::builder()
            .connect_timeout(config.http.connect_timeout)
            .user_agent(&config.http.user_agent)
            .build()?;

        // Create FIFO queue (empty initially, restored from database below)
        let queue =
            std::sync::Arc::new(tokio::sync::Mutex::new(std::collections::VecDeque::new()));

        // Semaphore sized from the persisted concurrency setting
        let concurrent_limit = std::sync::Arc::new(tokio::sync::Semaphore::new(
            settings.max_concurrent_downloads,
        ));

        // Create active downloads tracking map
        let active_downloads =
            std::sync::Arc::new(tokio::sync::Mutex::new(std::collections::HashMap::new()));

        let queue_state = QueueState {
            queue,
            concurrent_limit,
            active_downloads,
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
        };

        let downloader = Self {
            db: std::sync::Arc::new(db),
            event_tx,
            config: std::sync::Arc::new(config),
            client,
            settings: std::sync::Arc::new(tokio::sync::RwLock::new(settings)),
            queue_state,
        };

        // Restore any incomplete downloads from database (from previous session)
        downloader.restore_queue().await?;

        Ok(downloader)
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use http_dl::{Config, HttpDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = HttpDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("{:?}", event);
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::types::Event> {
        self.event_tx.subscribe()
    }

    /// Get the static configuration
    ///
    /// Returns the configuration the downloader was started with. Runtime-tunable
    /// values live in [`HttpDownloader::get_settings`] instead; this struct only
    /// carries what cannot change while running.
    pub fn get_config(&self) -> std::sync::Arc<Config> {
        std::sync::Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped (ok() converts
    /// Err to None). This allows downloads to continue even if no one is listening.
    pub(crate) fn emit_event(&self, event: crate::types::Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}
