use crate::db::*;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_database_creation() {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path();

    let db = Database::new(db_path).await.unwrap();

    // Verify tables exist
    let mut conn = db.pool.acquire().await.unwrap();

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&mut *conn)
            .await
            .unwrap();

    assert!(tables.contains(&"downloads".to_string()));
    assert!(tables.contains(&"settings".to_string()));
    assert!(tables.contains(&"runtime_state".to_string()));
    assert!(tables.contains(&"schema_version".to_string()));

    db.close().await;
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let temp_file = NamedTempFile::new().unwrap();

    // Open the same database file twice; the second open must not re-apply v1
    {
        let db = Database::new(temp_file.path()).await.unwrap();
        db.close().await;
    }
    let db = Database::new(temp_file.path()).await.unwrap();

    let mut conn = db.pool.acquire().await.unwrap();
    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(version, 1);

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(applied, 1, "migration v1 should be recorded exactly once");

    db.close().await;
}
