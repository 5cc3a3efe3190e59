//! Shared test helpers for creating HttpDownloader instances in tests.

use crate::config::Config;
use crate::downloader::HttpDownloader;
use tempfile::tempdir;

/// Helper to create a test HttpDownloader instance with a persistent database.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader() -> (HttpDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("test.db");
    config.download.default_download_folder = temp_dir.path().join("downloads");
    config.download.max_concurrent_downloads = 3;

    let downloader = HttpDownloader::new(config).await.unwrap();

    (downloader, temp_dir)
}

/// Insert a download row directly, bypassing `add()`, so tests can set up
/// arbitrary states.
pub(crate) async fn insert_download_row(
    downloader: &HttpDownloader,
    url: &str,
    filename: &str,
    destination: &str,
    status: crate::types::Status,
) -> crate::types::DownloadId {
    downloader
        .db
        .insert_download(&crate::db::NewDownload {
            url: url.to_string(),
            filename: filename.to_string(),
            destination: destination.to_string(),
            status: status.to_i32(),
            total_bytes: None,
        })
        .await
        .unwrap()
}
