//! Utility functions for URL handling and path manipulation

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Suffix appended to a destination path while its download is in flight
pub const TEMP_SUFFIX: &str = ".idmtemp";

/// Fallback filename hash space when a URL carries no usable name
const FALLBACK_NAME_SPACE: u64 = 1_000_000;

/// Validate that a string is a usable http/https URL
///
/// # Arguments
///
/// * `raw` - The URL string to validate
///
/// # Returns
///
/// Returns the parsed [`url::Url`] on success, or [`Error::InvalidUrl`] if the
/// string does not parse or uses a scheme other than http/https.
///
/// # Examples
///
/// ```
/// use http_dl::utils::validate_url;
///
/// assert!(validate_url("https://example.com/file.zip").is_ok());
/// assert!(validate_url("ftp://example.com/file.zip").is_err());
/// assert!(validate_url("not a url").is_err());
/// ```
pub fn validate_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw).map_err(|_| Error::InvalidUrl(raw.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::InvalidUrl(raw.to_string()));
    }
    if parsed.host_str().is_none() {
        return Err(Error::InvalidUrl(raw.to_string()));
    }
    Ok(parsed)
}

/// Derive a display filename from a URL
///
/// Takes the last path segment, percent-decoded. When the URL has no usable
/// segment (or the segment has no extension to suggest it is a file), a stable
/// `download_<n>` name is generated from a hash of the URL so the same URL
/// always yields the same fallback.
///
/// # Examples
///
/// ```
/// use http_dl::utils::filename_from_url;
///
/// assert_eq!(
///     filename_from_url("https://example.com/files/report%20final.pdf"),
///     "report final.pdf"
/// );
/// ```
pub fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url)
        && let Some(mut segments) = parsed.path_segments()
        && let Some(last_segment) = segments.next_back()
        && !last_segment.is_empty()
    {
        let decoded = urlencoding::decode(last_segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| last_segment.to_string());
        if decoded.contains('.') {
            return decoded;
        }
    }
    format!("download_{}", url_hash(url) % FALLBACK_NAME_SPACE)
}

fn url_hash(url: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    url.hash(&mut hasher);
    hasher.finish()
}

/// Extract a filename from a Content-Disposition header value
///
/// Handles both the plain `filename="name.ext"` form and the RFC 5987
/// `filename*=UTF-8''encoded-name` form. Returns `None` when the header
/// carries neither.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    for part in value.split(';') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("filename*=") {
            // Format is: charset'lang'encoded-filename
            if let Some(idx) = rest.rfind('\'') {
                let encoded = &rest[idx + 1..];
                if let Ok(decoded) = urlencoding::decode(encoded)
                    && !decoded.is_empty()
                {
                    return Some(decoded.into_owned());
                }
            }
        } else if let Some(rest) = part.strip_prefix("filename=") {
            let name = rest.trim_matches('"');
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Compute the in-flight temp path for a destination
///
/// The temp file sits next to the destination with [`TEMP_SUFFIX`] appended,
/// so the final rename never crosses a filesystem boundary.
///
/// # Examples
///
/// ```
/// use http_dl::utils::temp_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(
///     temp_path(Path::new("/downloads/file.zip")),
///     PathBuf::from("/downloads/file.zip.idmtemp")
/// );
/// ```
pub fn temp_path(destination: &Path) -> PathBuf {
    let mut os = destination.as_os_str().to_os_string();
    os.push(TEMP_SUFFIX);
    PathBuf::from(os)
}

/// Format a byte count for human-readable log output
///
/// # Examples
///
/// ```
/// use http_dl::utils::format_bytes;
///
/// assert_eq!(format_bytes(0), "0.0 B");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_accepts_http_and_https() {
        assert!(validate_url("http://example.com/file.zip").is_ok());
        assert!(validate_url("https://example.com/file.zip").is_ok());
    }

    #[test]
    fn validate_url_rejects_other_schemes() {
        assert!(validate_url("ftp://example.com/file.zip").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn validate_url_rejects_garbage() {
        assert!(validate_url("").is_err());
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("http://").is_err());
    }

    #[test]
    fn filename_from_url_uses_last_path_segment() {
        assert_eq!(
            filename_from_url("https://example.com/files/archive.tar.gz"),
            "archive.tar.gz"
        );
    }

    #[test]
    fn filename_from_url_percent_decodes() {
        assert_eq!(
            filename_from_url("https://example.com/report%20final.pdf"),
            "report final.pdf"
        );
    }

    #[test]
    fn filename_from_url_falls_back_on_bare_host() {
        let name = filename_from_url("https://example.com/");
        assert!(
            name.starts_with("download_"),
            "bare host should produce a generated name, got {name}"
        );
    }

    #[test]
    fn filename_from_url_falls_back_on_extensionless_segment() {
        let name = filename_from_url("https://example.com/api/v1/fetch");
        assert!(
            name.starts_with("download_"),
            "segment without a dot should produce a generated name, got {name}"
        );
    }

    #[test]
    fn filename_from_url_fallback_is_stable() {
        let a = filename_from_url("https://example.com/");
        let b = filename_from_url("https://example.com/");
        assert_eq!(a, b, "same URL should always yield the same fallback name");
    }

    #[test]
    fn content_disposition_quoted_filename() {
        let name =
            filename_from_content_disposition(r#"attachment; filename="Movie.2024.1080p.mkv""#);
        assert_eq!(name.as_deref(), Some("Movie.2024.1080p.mkv"));
    }

    #[test]
    fn content_disposition_unquoted_filename() {
        let name = filename_from_content_disposition("attachment; filename=report.pdf");
        assert_eq!(name.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn content_disposition_rfc5987_encoded_filename() {
        let name = filename_from_content_disposition(
            "attachment; filename*=UTF-8''file%20name%20with%20spaces.zip",
        );
        assert_eq!(name.as_deref(), Some("file name with spaces.zip"));
    }

    #[test]
    fn content_disposition_without_filename_returns_none() {
        assert_eq!(filename_from_content_disposition("inline"), None);
        assert_eq!(filename_from_content_disposition(""), None);
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="""#),
            None
        );
    }

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/downloads/file.zip")),
            PathBuf::from("/downloads/file.zip.idmtemp")
        );
    }

    #[test]
    fn temp_path_keeps_relative_paths_relative() {
        assert_eq!(
            temp_path(Path::new("downloads/file.zip")),
            PathBuf::from("downloads/file.zip.idmtemp")
        );
    }

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(512), "512.0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GB");
    }
}
