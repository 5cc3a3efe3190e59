//! Core download execution.
//!
//! A download task owns one transfer from slot acquisition to a terminal or
//! suspended state: probe the server, stream into the temp file, and either
//! move the file into place, record the failure, or leave the partial data
//! for a later resume.

use crate::error::Error;
use crate::retry::download_with_retry;
use crate::transfer::{self, StreamOutcome, StreamParams};
use crate::types::{DownloadId, Event, Status};
use crate::utils;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::HttpDownloader;
use super::progress::{ProgressReporterParams, spawn_progress_reporter};

/// Everything a download task needs to run
pub(crate) struct DownloadTaskContext {
    /// Download ID
    pub id: DownloadId,
    /// Handle to the engine (db, client, settings, event channel)
    pub downloader: HttpDownloader,
    /// Cancellation token for this download (pause/cancel/shutdown)
    pub cancel_token: tokio_util::sync::CancellationToken,
}

/// Run a single download to completion, failure, or interruption.
///
/// Errors are handled internally: failures are recorded in the database and
/// broadcast, never propagated to the queue processor.
pub(crate) async fn run_download_task(ctx: DownloadTaskContext) {
    let DownloadTaskContext {
        id,
        downloader,
        cancel_token,
    } = ctx;

    execute(&downloader, id, &cancel_token).await;

    // Deregister regardless of how the transfer ended. Pause and cancel
    // already removed the entry; this covers the natural exits.
    let mut active = downloader.queue_state.active_downloads.lock().await;
    active.remove(&id);
}

async fn execute(dl: &HttpDownloader, id: DownloadId, cancel_token: &tokio_util::sync::CancellationToken) {
    let download = match dl.db.get_download(id).await {
        Ok(Some(d)) => d,
        Ok(None) => {
            tracing::warn!(download_id = id.0, "Download row vanished before start");
            return;
        }
        Err(e) => {
            tracing::error!(download_id = id.0, error = %e, "Failed to load download");
            return;
        }
    };

    // The download may have been paused or cancelled between leaving the
    // queue and acquiring a slot
    if Status::from_i32(download.status) != Status::Queued {
        tracing::debug!(
            download_id = id.0,
            status = download.status,
            "Skipping download no longer queued"
        );
        return;
    }

    if let Err(e) = dl.db.update_status(id, Status::Downloading.to_i32()).await {
        tracing::error!(download_id = id.0, error = %e, "Failed to mark download active");
        return;
    }
    if let Err(e) = dl.db.clear_error(id).await {
        tracing::error!(download_id = id.0, error = %e, "Failed to clear previous error");
    }
    dl.emit_event(Event::Started { id });

    // Probe server capabilities before streaming
    let probe_result = download_with_retry(&dl.config.retry, || {
        transfer::probe(&dl.client, &download.url)
    })
    .await;

    let probe = match probe_result {
        Ok(p) => p,
        Err(e) => {
            mark_failed(dl, id, &e).await;
            return;
        }
    };

    // Persist what the server told us so resume and integrity checks survive
    // a restart
    if let Err(e) = dl.db.set_supports_resume(id, probe.supports_resume).await {
        tracing::error!(download_id = id.0, error = %e, "Failed to persist resume support");
    }
    if let Err(e) = dl.db.set_total_bytes(id, probe.total_bytes).await {
        tracing::error!(download_id = id.0, error = %e, "Failed to persist total size");
    }
    if let Some(ref name) = probe.filename
        && let Err(e) = dl.db.set_filename(id, name).await
    {
        tracing::error!(download_id = id.0, error = %e, "Failed to persist server filename");
    }

    let chunk_size = dl.settings.read().await.chunk_size;
    let destination = std::path::PathBuf::from(&download.destination);
    let temp = utils::temp_path(&destination);

    // Seed the counter with the bytes already on disk, so reporter ticks
    // fired before the ranged response arrives never publish a value below
    // the durable checkpoint. A genuine restart-from-zero resets the counter
    // inside the stream, which is the only place progress may regress.
    let start_bytes = if probe.supports_resume {
        tokio::fs::metadata(&temp).await.map(|m| m.len()).unwrap_or(0)
    } else {
        0
    };
    let downloaded = Arc::new(AtomicU64::new(start_bytes));

    // Reporter gets its own token so it can be stopped without touching the
    // download's token
    let reporter_token = tokio_util::sync::CancellationToken::new();
    let reporter = spawn_progress_reporter(ProgressReporterParams {
        id,
        total_bytes: probe.total_bytes,
        start_bytes,
        download_start: std::time::Instant::now(),
        downloaded: Arc::clone(&downloaded),
        event_tx: dl.event_tx.clone(),
        db: Arc::clone(&dl.db),
        cancel_token: reporter_token.clone(),
    });

    // The select covers cancellation during retry backoff; fetch_to_temp
    // handles cancellation mid-stream itself
    let outcome = tokio::select! {
        _ = cancel_token.cancelled() => Ok(StreamOutcome::Interrupted),
        result = download_with_retry(&dl.config.retry, || {
            fetch_attempt(dl, &download.url, &temp, chunk_size, &probe, &downloaded, cancel_token)
        }) => result,
    };

    reporter_token.cancel();
    let _ = reporter.await;

    match outcome {
        Ok(StreamOutcome::Completed { bytes }) => {
            finalize(dl, id, &temp, &destination, bytes).await;
        }
        Ok(StreamOutcome::Interrupted) => {
            handle_interruption(dl, id, &temp, downloaded.load(Ordering::SeqCst)).await;
        }
        Err(e) => {
            mark_failed(dl, id, &e).await;
        }
    }
}

/// One streaming attempt, shaped for the retry wrapper
async fn fetch_attempt(
    dl: &HttpDownloader,
    url: &str,
    temp: &std::path::Path,
    chunk_size: usize,
    probe: &transfer::ProbeResult,
    downloaded: &Arc<AtomicU64>,
    cancel_token: &tokio_util::sync::CancellationToken,
) -> crate::error::Result<StreamOutcome> {
    transfer::fetch_to_temp(StreamParams {
        client: &dl.client,
        url,
        temp_path: temp,
        chunk_size,
        supports_resume: probe.supports_resume,
        expected_total: probe.total_bytes,
        downloaded,
        cancel_token,
    })
    .await
}

/// Move the finished temp file into place and mark the download complete.
async fn finalize(
    dl: &HttpDownloader,
    id: DownloadId,
    temp: &std::path::Path,
    destination: &std::path::Path,
    bytes: u64,
) {
    // Replace any stale file at the destination
    if let Err(e) = tokio::fs::remove_file(destination).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(
            download_id = id.0,
            path = %destination.display(),
            error = %e,
            "Failed to remove existing file at destination"
        );
    }

    if let Err(e) = tokio::fs::rename(temp, destination).await {
        let err = Error::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to move '{}' to '{}': {}",
                temp.display(),
                destination.display(),
                e
            ),
        ));
        mark_failed(dl, id, &err).await;
        return;
    }

    if let Err(e) = dl.db.set_completed(id, bytes).await {
        tracing::error!(download_id = id.0, error = %e, "Failed to mark download complete");
    }

    tracing::info!(
        download_id = id.0,
        path = %destination.display(),
        size = %utils::format_bytes(bytes),
        "Download complete"
    );

    dl.emit_event(Event::Complete {
        id,
        path: destination.to_path_buf(),
    });
}

/// The cancellation token fired mid-transfer; figure out why and clean up.
async fn handle_interruption(
    dl: &HttpDownloader,
    id: DownloadId,
    temp: &std::path::Path,
    bytes: u64,
) {
    let status = match dl.db.get_download(id).await {
        Ok(Some(d)) => Status::from_i32(d.status),
        Ok(None) => {
            // Row deleted by remove(); it already cleaned up the temp file
            return;
        }
        Err(e) => {
            tracing::error!(download_id = id.0, error = %e, "Failed to read status after interruption");
            return;
        }
    };

    match status {
        Status::Cancelled => {
            // Belt and braces: cancel() deletes the temp file, but bytes may
            // have been flushed after its deletion
            tokio::fs::remove_file(temp).await.ok();
        }
        _ => {
            // Paused, or shutdown in progress; keep the partial data so the
            // transfer can resume later. Checkpoint the exact byte count -
            // the last reporter tick may be up to 500 ms stale.
            if let Err(e) = dl.db.update_progress(id, bytes, 0).await {
                tracing::error!(download_id = id.0, error = %e, "Failed to checkpoint progress");
            }
            tracing::debug!(
                download_id = id.0,
                status = %status,
                bytes,
                "Transfer interrupted, keeping partial data"
            );
        }
    }
}

/// Record a terminal failure and broadcast it.
async fn mark_failed(dl: &HttpDownloader, id: DownloadId, error: &Error) {
    let error_msg = error.to_string();

    tracing::error!(download_id = id.0, error = %error_msg, "Download failed");

    if let Err(e) = dl.db.update_status(id, Status::Failed.to_i32()).await {
        tracing::error!(download_id = id.0, error = %e, "Failed to update status to failed");
    }
    if let Err(e) = dl.db.set_error(id, &error_msg).await {
        tracing::error!(download_id = id.0, error = %e, "Failed to record error message");
    }

    dl.emit_event(Event::Failed {
        id,
        error: error_msg,
    });
}
