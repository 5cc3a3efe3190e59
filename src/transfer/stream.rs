//! Chunked streaming fetch with resume and integrity checking.
//!
//! A transfer writes into the `.idmtemp` file next to the destination. The
//! shared byte counter only advances after a chunk has been handed to the
//! file, so observers never see progress ahead of what is on disk. When the
//! server honors ranges, a fresh attempt picks up from the temp file length;
//! when it refuses a range the attempt restarts from zero instead of failing.

use crate::error::{Error, Result, TransferError};
use futures::StreamExt;
use reqwest::header;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Inputs for a single streaming fetch into a temp file.
pub(crate) struct StreamParams<'a> {
    /// HTTP client to issue the request with
    pub client: &'a reqwest::Client,
    /// Source URL
    pub url: &'a str,
    /// The `.idmtemp` file the bytes land in
    pub temp_path: &'a Path,
    /// Maximum bytes per file write
    pub chunk_size: usize,
    /// Whether the server advertised byte-range support
    pub supports_resume: bool,
    /// Server-reported total size, when known
    pub expected_total: Option<u64>,
    /// Shared byte counter observed by the progress reporter
    pub downloaded: &'a Arc<AtomicU64>,
    /// Cooperative cancellation (pause and cancel both flow through this)
    pub cancel_token: &'a CancellationToken,
}

/// How a streaming fetch ended.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StreamOutcome {
    /// Every byte arrived and matched the expected total
    Completed {
        /// Total bytes now in the temp file
        bytes: u64,
    },
    /// The cancellation token fired; the temp file holds a valid prefix
    Interrupted,
}

/// Fetch the URL into the temp file, resuming from its current length.
///
/// Handles the range-refused cases internally: a server that answers a ranged
/// request with 200, an unexpected total, or an unsatisfiable offset gets one
/// restart from zero before any error surfaces.
pub(crate) async fn fetch_to_temp(params: StreamParams<'_>) -> Result<StreamOutcome> {
    let mut allow_resume = params.supports_resume;
    loop {
        match attempt(&params, allow_resume).await {
            Err(Error::Transfer(TransferError::RangeNotSupported)) if allow_resume => {
                tracing::warn!(
                    url = params.url,
                    "Server refused byte range, restarting from zero"
                );
                allow_resume = false;
            }
            other => return other,
        }
    }
}

async fn attempt(params: &StreamParams<'_>, allow_resume: bool) -> Result<StreamOutcome> {
    let start_offset = if allow_resume {
        existing_len(params.temp_path).await
    } else {
        0
    };

    let response = if start_offset > 0 {
        let response = params
            .client
            .get(params.url)
            .header(header::RANGE, format!("bytes={}-", start_offset))
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::PARTIAL_CONTENT => {
                // A total that disagrees with what we recorded means the
                // remote file changed; the partial data is worthless.
                if let Some(total) = content_range_total(response.headers())
                    && params.expected_total.is_some_and(|expected| expected != total)
                {
                    return Err(Error::Transfer(TransferError::RangeNotSupported));
                }
                response
            }
            reqwest::StatusCode::RANGE_NOT_SATISFIABLE => {
                // Asked past the end: if we already hold the whole file the
                // transfer is done, otherwise start over.
                return if params.expected_total.is_some_and(|t| start_offset >= t) {
                    params.downloaded.store(start_offset, Ordering::SeqCst);
                    Ok(StreamOutcome::Completed {
                        bytes: start_offset,
                    })
                } else {
                    Err(Error::Transfer(TransferError::RangeNotSupported))
                };
            }
            reqwest::StatusCode::OK => {
                // Server ignored the Range header entirely
                return Err(Error::Transfer(TransferError::RangeNotSupported));
            }
            status if !status.is_success() => {
                return Err(Error::Transfer(TransferError::ServerRejection {
                    status: status.as_u16(),
                }));
            }
            _ => response,
        }
    } else {
        let response = params.client.get(params.url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Transfer(TransferError::ServerRejection {
                status: response.status().as_u16(),
            }));
        }
        response
    };

    let mut file = open_temp(params.temp_path, start_offset > 0).await?;
    params.downloaded.store(start_offset, Ordering::SeqCst);

    let mut stream = response.bytes_stream();
    let mut written = start_offset;

    loop {
        let next = tokio::select! {
            _ = params.cancel_token.cancelled() => {
                flush(&mut file).await?;
                return Ok(StreamOutcome::Interrupted);
            }
            next = stream.next() => next,
        };
        let Some(chunk) = next else { break };
        let bytes = chunk?;

        for slice in bytes.chunks(params.chunk_size.max(1)) {
            if params.cancel_token.is_cancelled() {
                flush(&mut file).await?;
                return Ok(StreamOutcome::Interrupted);
            }
            file.write_all(slice).await.map_err(|e| {
                Error::Transfer(TransferError::Disk(format!("Failed to write chunk: {}", e)))
            })?;
            written += slice.len() as u64;
            params.downloaded.store(written, Ordering::SeqCst);
        }
    }

    flush(&mut file).await?;

    if let Some(expected) = params.expected_total
        && written != expected
    {
        return Err(Error::Transfer(TransferError::IntegrityMismatch {
            expected,
            actual: written,
        }));
    }

    Ok(StreamOutcome::Completed { bytes: written })
}

async fn open_temp(path: &Path, append: bool) -> Result<File> {
    let result = if append {
        OpenOptions::new().append(true).open(path).await
    } else {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await
    };
    result.map_err(|e| {
        Error::Transfer(TransferError::Disk(format!(
            "Failed to open temp file: {}",
            e
        )))
    })
}

async fn flush(file: &mut File) -> Result<()> {
    file.flush().await.map_err(|e| {
        Error::Transfer(TransferError::Disk(format!(
            "Failed to flush temp file: {}",
            e
        )))
    })
}

async fn existing_len(path: &Path) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

/// Pull the total size out of a `Content-Range: bytes 500-999/1000` header.
fn content_range_total(headers: &header::HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit('/').next())
        .and_then(|total| total.trim().parse::<u64>().ok())
}
