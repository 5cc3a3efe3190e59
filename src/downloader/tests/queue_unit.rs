use crate::downloader::test_helpers::{create_test_downloader, insert_download_row};
use crate::error::{DownloadError, Error};
use crate::types::{AddOptions, DownloadId, Status};

// --- add_to_queue() tests ---

#[tokio::test]
async fn test_add_places_download_in_queue() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let id = downloader
        .add("https://example.com/file.zip", AddOptions::default())
        .await
        .unwrap();

    // add() already calls add_to_queue internally, verify it's there
    let queue = downloader.queue_state.queue.lock().await;
    assert_eq!(queue.len(), 1, "queue should contain the added download");
    assert_eq!(
        queue.front().unwrap().id,
        id,
        "queued download ID should match"
    );
}

#[tokio::test]
async fn test_add_to_queue_nonexistent_download_returns_not_found() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let result = downloader.add_to_queue(DownloadId(99999)).await;

    match result {
        Err(Error::Download(DownloadError::NotFound { id })) => {
            assert_eq!(id, 99999, "error should carry the nonexistent ID");
        }
        other => panic!("Expected NotFound error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_queue_preserves_insertion_order() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let mut ids = Vec::new();
    for i in 0..3 {
        let id = downloader
            .add(
                &format!("https://example.com/file{}.zip", i),
                AddOptions::default(),
            )
            .await
            .unwrap();
        ids.push(id);
    }

    let queue = downloader.queue_state.queue.lock().await;
    let queued_ids: Vec<_> = queue.iter().map(|item| item.id).collect();
    assert_eq!(
        queued_ids, ids,
        "queue order must match the order downloads were added"
    );
}

// --- remove_from_queue() tests ---

#[tokio::test]
async fn test_remove_from_queue_removes_only_the_target() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let first = downloader
        .add("https://example.com/a.zip", AddOptions::default())
        .await
        .unwrap();
    let second = downloader
        .add("https://example.com/b.zip", AddOptions::default())
        .await
        .unwrap();

    let removed = downloader.remove_from_queue(first).await;
    assert!(removed, "existing queued download should be removed");

    let queue = downloader.queue_state.queue.lock().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.front().unwrap().id, second);
}

#[tokio::test]
async fn test_remove_from_queue_missing_download_returns_false() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let removed = downloader.remove_from_queue(DownloadId(12345)).await;
    assert!(!removed, "removing an unknown ID should return false");
}

// --- restore_queue() tests ---

#[tokio::test]
async fn test_restore_queue_requeues_queued_and_interrupted_downloads() {
    let (downloader, temp_dir) = create_test_downloader().await;

    let queued = insert_download_row(
        &downloader,
        "https://example.com/queued.zip",
        "queued.zip",
        &temp_dir.path().join("queued.zip").to_string_lossy(),
        Status::Queued,
    )
    .await;
    let interrupted = insert_download_row(
        &downloader,
        "https://example.com/interrupted.zip",
        "interrupted.zip",
        &temp_dir.path().join("interrupted.zip").to_string_lossy(),
        Status::Downloading,
    )
    .await;

    downloader.restore_queue().await.unwrap();

    let queue = downloader.queue_state.queue.lock().await;
    let queued_ids: Vec<_> = queue.iter().map(|item| item.id).collect();
    assert!(queued_ids.contains(&queued));
    assert!(queued_ids.contains(&interrupted));
    drop(queue);

    // The interrupted download must be back in Queued state
    let row = downloader.db.get_download(interrupted).await.unwrap().unwrap();
    assert_eq!(
        Status::from_i32(row.status),
        Status::Queued,
        "interrupted download should be reset to Queued"
    );
}

#[tokio::test]
async fn test_restore_queue_skips_paused_and_terminal_downloads() {
    let (downloader, temp_dir) = create_test_downloader().await;

    for (name, status) in [
        ("paused.zip", Status::Paused),
        ("complete.zip", Status::Complete),
        ("failed.zip", Status::Failed),
        ("cancelled.zip", Status::Cancelled),
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

    downloader.restore_queue().await.unwrap();

    let queue = downloader.queue_state.queue.lock().await;
    assert!(
        queue.is_empty(),
        "paused and terminal downloads must not be restored"
    );
}
