use crate::db::*;
use tempfile::NamedTempFile;

fn sample_download(name: &str) -> NewDownload {
    NewDownload {
        url: format!("https://example.com/{name}"),
        filename: name.to_string(),
        destination: format!("/downloads/{name}"),
        status: 0, // Queued
        total_bytes: None,
    }
}

#[tokio::test]
async fn test_insert_and_get_download() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let new_download = NewDownload {
        url: "https://example.com/archive.zip".to_string(),
        filename: "archive.zip".to_string(),
        destination: "/downloads/archive.zip".to_string(),
        status: 0,
        total_bytes: Some(1024 * 1024),
    };

    let id = db.insert_download(&new_download).await.unwrap();
    assert!(id.0 > 0);

    let download = db.get_download(id).await.unwrap();
    assert!(download.is_some());

    let download = download.unwrap();
    assert_eq!(download.url, "https://example.com/archive.zip");
    assert_eq!(download.filename, "archive.zip");
    assert_eq!(download.destination, "/downloads/archive.zip");
    assert_eq!(download.status, 0);
    assert_eq!(download.total_bytes, Some(1024 * 1024));
    assert_eq!(download.downloaded_bytes, 0);
    assert_eq!(download.supports_resume, 0);
    assert!(download.error_message.is_none());
    assert!(download.completed_at.is_none());

    db.close().await;
}

#[tokio::test]
async fn test_list_downloads_in_insertion_order() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    for i in 0..3 {
        db.insert_download(&sample_download(&format!("file{i}.bin")))
            .await
            .unwrap();
    }

    let downloads = db.list_downloads().await.unwrap();
    assert_eq!(downloads.len(), 3);

    // FIFO: oldest insertion first
    assert_eq!(downloads[0].filename, "file0.bin");
    assert_eq!(downloads[1].filename, "file1.bin");
    assert_eq!(downloads[2].filename, "file2.bin");

    db.close().await;
}

#[tokio::test]
async fn test_update_status() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id = db
        .insert_download(&sample_download("file.bin"))
        .await
        .unwrap();

    db.update_status(id, 1).await.unwrap(); // Downloading
    let download = db.get_download(id).await.unwrap().unwrap();
    assert_eq!(download.status, 1);

    db.update_status(id, 2).await.unwrap(); // Paused
    let download = db.get_download(id).await.unwrap().unwrap();
    assert_eq!(download.status, 2);

    db.close().await;
}

#[tokio::test]
async fn test_update_progress() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id = db
        .insert_download(&sample_download("file.bin"))
        .await
        .unwrap();

    db.update_progress(id, 4096, 2048).await.unwrap();

    let download = db.get_download(id).await.unwrap().unwrap();
    assert_eq!(download.downloaded_bytes, 4096);
    assert_eq!(download.speed_bps, 2048);

    db.close().await;
}

#[tokio::test]
async fn test_set_total_bytes_and_resume_support() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id = db
        .insert_download(&sample_download("file.bin"))
        .await
        .unwrap();

    db.set_total_bytes(id, Some(1000)).await.unwrap();
    db.set_supports_resume(id, true).await.unwrap();

    let download = db.get_download(id).await.unwrap().unwrap();
    assert_eq!(download.total_bytes, Some(1000));
    assert_eq!(download.supports_resume, 1);

    // Probe on an unknown-length server clears the total again
    db.set_total_bytes(id, None).await.unwrap();
    let download = db.get_download(id).await.unwrap().unwrap();
    assert_eq!(download.total_bytes, None);

    db.close().await;
}

#[tokio::test]
async fn test_set_and_clear_error() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id = db
        .insert_download(&sample_download("file.bin"))
        .await
        .unwrap();

    db.set_error(id, "connection reset").await.unwrap();
    let download = db.get_download(id).await.unwrap().unwrap();
    assert_eq!(download.error_message.as_deref(), Some("connection reset"));

    db.clear_error(id).await.unwrap();
    let download = db.get_download(id).await.unwrap().unwrap();
    assert!(download.error_message.is_none());

    db.close().await;
}

#[tokio::test]
async fn test_set_completed() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id = db
        .insert_download(&sample_download("file.bin"))
        .await
        .unwrap();
    db.set_error(id, "stale error from an earlier attempt")
        .await
        .unwrap();

    db.set_completed(id, 1000).await.unwrap();

    let download = db.get_download(id).await.unwrap().unwrap();
    assert_eq!(download.status, 3, "status should be Complete");
    assert_eq!(download.downloaded_bytes, 1000);
    assert_eq!(download.speed_bps, 0);
    assert!(download.completed_at.is_some());
    assert!(
        download.error_message.is_none(),
        "completion should clear stale errors"
    );

    db.close().await;
}

#[tokio::test]
async fn test_delete_download() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id = db
        .insert_download(&sample_download("file.bin"))
        .await
        .unwrap();

    db.delete_download(id).await.unwrap();
    assert!(db.get_download(id).await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_get_incomplete_downloads() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let queued = db
        .insert_download(&sample_download("queued.bin"))
        .await
        .unwrap();
    let downloading = db
        .insert_download(&sample_download("downloading.bin"))
        .await
        .unwrap();
    let paused = db
        .insert_download(&sample_download("paused.bin"))
        .await
        .unwrap();
    let complete = db
        .insert_download(&sample_download("complete.bin"))
        .await
        .unwrap();

    db.update_status(downloading, 1).await.unwrap();
    db.update_status(paused, 2).await.unwrap();
    db.update_status(complete, 3).await.unwrap();

    let incomplete = db.get_incomplete_downloads().await.unwrap();
    let ids: Vec<i64> = incomplete.iter().map(|d| d.id).collect();

    assert!(ids.contains(&queued.0));
    assert!(ids.contains(&downloading.0));
    assert!(
        !ids.contains(&paused.0),
        "paused downloads stay paused across restarts"
    );
    assert!(!ids.contains(&complete.0));

    db.close().await;
}

#[tokio::test]
async fn test_find_active_by_destination() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id = db
        .insert_download(&sample_download("file.bin"))
        .await
        .unwrap();

    let hit = db
        .find_active_by_destination("/downloads/file.bin")
        .await
        .unwrap();
    assert_eq!(hit.map(|d| d.id), Some(id.0));

    // Terminal states free the destination
    db.update_status(id, 3).await.unwrap(); // Complete
    let hit = db
        .find_active_by_destination("/downloads/file.bin")
        .await
        .unwrap();
    assert!(hit.is_none());

    db.close().await;
}

#[tokio::test]
async fn test_list_downloads_by_status() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let a = db.insert_download(&sample_download("a.bin")).await.unwrap();
    let b = db.insert_download(&sample_download("b.bin")).await.unwrap();
    db.insert_download(&sample_download("c.bin")).await.unwrap();

    db.update_status(a, 4).await.unwrap(); // Failed
    db.update_status(b, 4).await.unwrap();

    let failed = db.list_downloads_by_status(4).await.unwrap();
    assert_eq!(failed.len(), 2);

    let queued = db.list_downloads_by_status(0).await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].filename, "c.bin");

    db.close().await;
}
