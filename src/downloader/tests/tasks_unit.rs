use crate::downloader::test_helpers::{create_test_downloader, insert_download_row};
use crate::error::{DownloadError, Error};
use crate::types::{AddOptions, DownloadId, Event, Status};
use std::path::PathBuf;

// --- add() tests ---

#[tokio::test]
async fn test_add_creates_queued_row_with_derived_filename() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let id = downloader
        .add(
            "https://example.com/path/archive.tar.gz",
            AddOptions::default(),
        )
        .await
        .unwrap();

    let info = downloader.get(id).await.unwrap();
    assert_eq!(info.status, Status::Queued);
    assert_eq!(info.filename, "archive.tar.gz");
    assert_eq!(info.downloaded_bytes, 0);
    assert_eq!(info.total_bytes, None);
}

#[tokio::test]
async fn test_add_honors_filename_and_folder_overrides() {
    let (downloader, temp_dir) = create_test_downloader().await;
    let folder = temp_dir.path().join("custom");

    let id = downloader
        .add(
            "https://example.com/file.zip",
            AddOptions {
                destination_folder: Some(folder.clone()),
                filename: Some("renamed.zip".to_string()),
            },
        )
        .await
        .unwrap();

    let info = downloader.get(id).await.unwrap();
    assert_eq!(info.filename, "renamed.zip");
    assert_eq!(info.destination, folder.join("renamed.zip"));
    assert!(folder.is_dir(), "destination folder should be created");
}

#[tokio::test]
async fn test_add_rejects_invalid_urls() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    for url in ["not a url", "ftp://example.com/file.zip", "https://"] {
        let result = downloader.add(url, AddOptions::default()).await;
        assert!(
            matches!(result, Err(Error::InvalidUrl(_))),
            "expected InvalidUrl for {url:?}, got {result:?}"
        );
    }
}

#[tokio::test]
async fn test_add_rejects_duplicate_destination() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    downloader
        .add("https://example.com/file.zip", AddOptions::default())
        .await
        .unwrap();

    // Different URL, same resolved destination
    let result = downloader
        .add(
            "https://mirror.example.com/other.bin",
            AddOptions {
                destination_folder: None,
                filename: Some("file.zip".to_string()),
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(Error::Download(DownloadError::DuplicateDestination { .. }))
    ));
}

#[tokio::test]
async fn test_add_allows_destination_of_terminal_download() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let id = downloader
        .add("https://example.com/file.zip", AddOptions::default())
        .await
        .unwrap();
    downloader.cancel(id).await.unwrap();

    // Cancelled downloads no longer own their destination
    downloader
        .add("https://example.com/file.zip", AddOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_emits_queued_event() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    let mut events = downloader.subscribe();

    let id = downloader
        .add("https://example.com/file.zip", AddOptions::default())
        .await
        .unwrap();

    let event = events.try_recv().unwrap();
    match event {
        Event::Queued {
            id: event_id,
            filename,
        } => {
            assert_eq!(event_id, id);
            assert_eq!(filename, "file.zip");
        }
        other => panic!("Expected Queued event, got {other:?}"),
    }
}

// --- get() / list() / queue_stats() tests ---

#[tokio::test]
async fn test_get_unknown_id_returns_not_found() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let result = downloader.get(DownloadId(9999)).await;
    assert!(matches!(
        result,
        Err(Error::Download(DownloadError::NotFound { id: 9999 }))
    ));
}

#[tokio::test]
async fn test_list_returns_downloads_in_insertion_order() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(
            downloader
                .add(
                    &format!("https://example.com/file{}.zip", i),
                    AddOptions::default(),
                )
                .await
                .unwrap(),
        );
    }

    let listed: Vec<_> = downloader
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|info| info.id)
        .collect();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn test_queue_stats_counts_by_status() {
    let (downloader, temp_dir) = create_test_downloader().await;

    for (name, status) in [
        ("a.zip", Status::Queued),
        ("b.zip", Status::Queued),
        ("c.zip", Status::Downloading),
        ("d.zip", Status::Paused),
        ("e.zip", Status::Complete),
        ("f.zip", Status::Failed),
        ("g.zip", Status::Cancelled),
    ] {
        insert_download_row(
            &downloader,
            &format!("https://example.com/{}", name),
            name,
            &temp_dir.path().join(name).to_string_lossy(),
            status,
        )
        .await;
    }

    let stats = downloader.queue_stats().await.unwrap();
    assert_eq!(stats.queued, 2);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.paused, 1);
    assert_eq!(stats.complete, 1);
    assert_eq!(stats.failed, 1);
}

// --- remove() tests ---

#[tokio::test]
async fn test_remove_deletes_row_temp_file_and_queue_entry() {
    let (downloader, temp_dir) = create_test_downloader().await;

    let id = downloader
        .add("https://example.com/file.zip", AddOptions::default())
        .await
        .unwrap();

    let destination = temp_dir.path().join("downloads").join("file.zip");
    let temp_path = crate::utils::temp_path(&destination);
    std::fs::write(&temp_path, b"partial").unwrap();

    downloader.remove(id).await.unwrap();

    assert!(matches!(
        downloader.get(id).await,
        Err(Error::Download(DownloadError::NotFound { .. }))
    ));
    assert!(!temp_path.exists(), "remove must delete the temp file");

    let queue = downloader.queue_state.queue.lock().await;
    assert!(queue.is_empty(), "remove must clear the queue entry");
}

#[tokio::test]
async fn test_remove_keeps_completed_file_on_disk() {
    let (downloader, temp_dir) = create_test_downloader().await;

    let destination = temp_dir.path().join("done.zip");
    std::fs::write(&destination, b"finished bytes").unwrap();

    let id = insert_download_row(
        &downloader,
        "https://example.com/done.zip",
        "done.zip",
        &destination.to_string_lossy(),
        Status::Complete,
    )
    .await;

    downloader.remove(id).await.unwrap();

    assert!(
        destination.exists(),
        "removing the record must not delete the completed file"
    );
}

#[tokio::test]
async fn test_info_paths_are_pathbufs() {
    let (downloader, temp_dir) = create_test_downloader().await;

    let id = downloader
        .add("https://example.com/file.zip", AddOptions::default())
        .await
        .unwrap();

    let info = downloader.get(id).await.unwrap();
    assert_eq!(
        info.destination,
        PathBuf::from(temp_dir.path().join("downloads").join("file.zip"))
    );
}
