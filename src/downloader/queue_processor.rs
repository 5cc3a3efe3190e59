//! Queue processor — admits queued downloads as slots free up and spawns
//! their download tasks.

use std::time::Duration;

use super::HttpDownloader;
use super::download_task::DownloadTaskContext;

/// Interval between queue polling attempts when the queue is empty
const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl HttpDownloader {
    /// Start the queue processor task
    ///
    /// This method spawns a background task that continuously:
    /// 1. Takes the oldest download from the FIFO queue
    /// 2. Acquires a permit from the concurrency limiter (respects max_concurrent_downloads)
    /// 3. Spawns a download task for that download
    /// 4. Repeats until shutdown
    ///
    /// Admission is strictly FIFO: a download never starts before one that was
    /// enqueued earlier, and at most `max_concurrent_downloads` transfers run
    /// at once. Raising the limit at runtime opens slots for waiting downloads;
    /// lowering it only throttles future admissions - running transfers are
    /// never evicted.
    pub fn start_queue_processor(&self) -> tokio::task::JoinHandle<()> {
        let queue = self.queue_state.queue.clone();
        let concurrent_limit = self.queue_state.concurrent_limit.clone();
        let active_downloads = self.queue_state.active_downloads.clone();
        let downloader = self.clone();

        tokio::spawn(async move {
            loop {
                // Take the oldest queued download (keep the full item for
                // re-push if the semaphore is closed)
                let queued_item = {
                    let mut queue_guard = queue.lock().await;
                    queue_guard.pop_front()
                };

                if let Some(item) = queued_item {
                    let id = item.id;

                    // Acquire a permit from the semaphore (blocks while at max concurrency)
                    let permit = concurrent_limit.clone().acquire_owned().await;

                    let permit = match permit {
                        Ok(p) => p,
                        Err(_) => {
                            // Semaphore closed — re-push the item so it isn't lost
                            let mut queue_guard = queue.lock().await;
                            queue_guard.push_front(item);
                            break;
                        }
                    };

                    // Create cancellation token for this download
                    let cancel_token = tokio_util::sync::CancellationToken::new();

                    // Register the cancellation token
                    {
                        let mut active = active_downloads.lock().await;
                        active.insert(id, cancel_token.clone());
                    }

                    let ctx = DownloadTaskContext {
                        id,
                        downloader: downloader.clone(),
                        cancel_token,
                    };

                    // Spawn the download task; the permit is released when the
                    // task finishes
                    tokio::spawn(async move {
                        let _permit = permit;
                        super::download_task::run_download_task(ctx).await;
                    });
                } else {
                    // Queue is empty, wait a bit before checking again
                    tokio::time::sleep(QUEUE_POLL_INTERVAL).await;
                }
            }
        })
    }
}
