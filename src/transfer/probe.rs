//! Capability probe: file size, range support, server-suggested filename.

use crate::error::{Error, Result, TransferError};
use crate::utils::filename_from_content_disposition;
use reqwest::header;

/// What the server told us about a URL before the transfer starts.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProbeResult {
    /// Content-Length, when the server reports one
    pub total_bytes: Option<u64>,
    /// Whether the server advertises byte-range support
    pub supports_resume: bool,
    /// Filename suggested via Content-Disposition
    pub filename: Option<String>,
}

/// Probe a URL with a HEAD request.
///
/// Servers that reject HEAD outright (405/501) are treated as advertising no
/// capabilities rather than as a failure; the GET that follows still works.
pub(crate) async fn probe(client: &reqwest::Client, url: &str) -> Result<ProbeResult> {
    let response = client.head(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        if status == reqwest::StatusCode::METHOD_NOT_ALLOWED
            || status == reqwest::StatusCode::NOT_IMPLEMENTED
        {
            tracing::debug!(url, %status, "Server rejects HEAD, proceeding without capabilities");
            return Ok(ProbeResult::default());
        }
        return Err(Error::Transfer(TransferError::ServerRejection {
            status: status.as_u16(),
        }));
    }

    Ok(read_capabilities(response.headers()))
}

fn read_capabilities(headers: &header::HeaderMap) -> ProbeResult {
    let total_bytes = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let supports_resume = headers
        .get(header::ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            let v = v.trim();
            !v.is_empty() && !v.eq_ignore_ascii_case("none")
        });

    let filename = headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_content_disposition);

    ProbeResult {
        total_bytes,
        supports_resume,
        filename,
    }
}
