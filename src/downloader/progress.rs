//! Periodic progress reporting for active transfers.

use crate::types::{DownloadId, Event};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Interval between progress update emissions
const PROGRESS_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Parameters for spawning a progress reporter background task
pub(crate) struct ProgressReporterParams {
    /// Download ID
    pub id: DownloadId,
    /// Expected total size in bytes, when known
    pub total_bytes: Option<u64>,
    /// Bytes already on disk when this transfer attempt started (for speed)
    pub start_bytes: u64,
    /// Transfer start time
    pub download_start: std::time::Instant,
    /// Atomic counter for bytes written to disk
    pub downloaded: Arc<AtomicU64>,
    /// Event broadcast sender
    pub event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Database handle
    pub db: Arc<crate::db::Database>,
    /// Cancellation token
    pub cancel_token: tokio_util::sync::CancellationToken,
}

/// Spawn a background task that periodically reports download progress.
///
/// Every tick reads the shared byte counter, persists it, and broadcasts a
/// `Downloading` event. The counter only advances after bytes are on disk, so
/// reported progress never runs ahead of the temp file.
pub(crate) fn spawn_progress_reporter(
    params: ProgressReporterParams,
) -> tokio::task::JoinHandle<()> {
    let ProgressReporterParams {
        id,
        total_bytes,
        start_bytes,
        download_start,
        downloaded,
        event_tx,
        db,
        cancel_token,
    } = params;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PROGRESS_UPDATE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let current_bytes = downloaded.load(Ordering::SeqCst);

                    let percent = match total_bytes {
                        Some(total) if total > 0 => {
                            (current_bytes as f64 / total as f64) * 100.0
                        }
                        // Unknown total: no meaningful percentage
                        _ => 0.0,
                    };

                    // Speed counts only bytes from this session, not resumed data
                    let elapsed_secs = download_start.elapsed().as_secs_f64();
                    let speed_bps = if elapsed_secs > 0.0 {
                        ((current_bytes.saturating_sub(start_bytes)) as f64 / elapsed_secs) as u64
                    } else {
                        0
                    };

                    if let Err(e) = db.update_progress(id, current_bytes, speed_bps).await {
                        tracing::error!(download_id = id.0, error = %e, "Failed to update progress");
                    }

                    event_tx
                        .send(Event::Downloading {
                            id,
                            downloaded_bytes: current_bytes,
                            total_bytes,
                            percent,
                            speed_bps,
                        })
                        .ok();
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewDownload};
    use crate::types::Status;
    use std::time::Duration;

    /// Helper to create a test database with a download row.
    async fn setup_db() -> (Arc<Database>, DownloadId, tempfile::NamedTempFile) {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::new(temp_file.path()).await.unwrap();
        let db = Arc::new(db);

        let download_id = db
            .insert_download(&NewDownload {
                url: "https://example.com/file.bin".to_string(),
                filename: "file.bin".to_string(),
                destination: "/tmp/file.bin".to_string(),
                status: Status::Downloading.to_i32(),
                total_bytes: Some(1000),
            })
            .await
            .unwrap();

        (db, download_id, temp_file)
    }

    #[tokio::test]
    async fn progress_reporter_emits_downloading_events() {
        let (db, download_id, _temp) = setup_db().await;
        let (event_tx, mut event_rx) = tokio::sync::broadcast::channel(100);
        let cancel_token = tokio_util::sync::CancellationToken::new();

        let _handle = spawn_progress_reporter(ProgressReporterParams {
            id: download_id,
            total_bytes: Some(1000),
            start_bytes: 0,
            download_start: std::time::Instant::now(),
            downloaded: Arc::new(AtomicU64::new(250)),
            event_tx,
            db,
            cancel_token: cancel_token.clone(),
        });

        let event = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
            .await
            .unwrap()
            .unwrap();

        cancel_token.cancel();

        match event {
            Event::Downloading {
                downloaded_bytes,
                percent,
                ..
            } => {
                assert_eq!(downloaded_bytes, 250);
                assert!(
                    (percent - 25.0).abs() < 0.01,
                    "Expected 25% (250/1000), got {percent}"
                );
            }
            other => panic!("Expected Downloading event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn progress_reporter_persists_byte_count() {
        let (db, download_id, _temp) = setup_db().await;
        let (event_tx, mut event_rx) = tokio::sync::broadcast::channel(100);
        let cancel_token = tokio_util::sync::CancellationToken::new();

        let _handle = spawn_progress_reporter(ProgressReporterParams {
            id: download_id,
            total_bytes: Some(1000),
            start_bytes: 0,
            download_start: std::time::Instant::now(),
            downloaded: Arc::new(AtomicU64::new(600)),
            event_tx,
            db: db.clone(),
            cancel_token: cancel_token.clone(),
        });

        // Wait for the first tick to land in the database
        tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
            .await
            .unwrap()
            .unwrap();

        cancel_token.cancel();

        let row = db.get_download(download_id).await.unwrap().unwrap();
        assert_eq!(row.downloaded_bytes, 600);
    }

    #[tokio::test]
    async fn progress_reporter_reports_zero_percent_for_unknown_total() {
        let (db, download_id, _temp) = setup_db().await;
        let (event_tx, mut event_rx) = tokio::sync::broadcast::channel(100);
        let cancel_token = tokio_util::sync::CancellationToken::new();

        let _handle = spawn_progress_reporter(ProgressReporterParams {
            id: download_id,
            total_bytes: None,
            start_bytes: 0,
            download_start: std::time::Instant::now(),
            downloaded: Arc::new(AtomicU64::new(500)),
            event_tx,
            db,
            cancel_token: cancel_token.clone(),
        });

        let event = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
            .await
            .unwrap()
            .unwrap();

        cancel_token.cancel();

        match event {
            Event::Downloading {
                percent,
                total_bytes,
                ..
            } => {
                assert_eq!(percent, 0.0);
                assert_eq!(total_bytes, None);
            }
            other => panic!("Expected Downloading event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn progress_reporter_stops_on_cancellation() {
        let (db, download_id, _temp) = setup_db().await;
        let (event_tx, _rx) = tokio::sync::broadcast::channel(100);
        let cancel_token = tokio_util::sync::CancellationToken::new();

        let handle = spawn_progress_reporter(ProgressReporterParams {
            id: download_id,
            total_bytes: Some(1000),
            start_bytes: 0,
            download_start: std::time::Instant::now(),
            downloaded: Arc::new(AtomicU64::new(0)),
            event_tx,
            db,
            cancel_token: cancel_token.clone(),
        });

        cancel_token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(
            result.is_ok(),
            "Progress reporter should stop within 1 second after cancellation"
        );
        result.unwrap().unwrap();
    }
}
