//! Persisted user settings.
//!
//! Settings live in a key/value table so new knobs can be added without a
//! schema migration. Writes go through a single transaction so a partially
//! applied settings change is never visible.

use crate::error::DatabaseError;
use crate::types::Settings;
use crate::{Error, Result};
use std::path::PathBuf;

use super::Database;

const KEY_MAX_CONCURRENT: &str = "max_concurrent_downloads";
const KEY_DEFAULT_FOLDER: &str = "default_download_folder";
const KEY_CHUNK_SIZE: &str = "chunk_size";
const KEY_NOTIFICATIONS: &str = "notifications_enabled";

impl Database {
    /// Load settings, seeding any missing keys from the given defaults
    ///
    /// Values that fail to parse fall back to the default for that key.
    pub async fn load_settings(&self, defaults: &Settings) -> Result<Settings> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to load settings: {}",
                        e
                    )))
                })?;

        let mut settings = defaults.clone();
        let mut seen = std::collections::HashSet::new();

        for (key, value) in rows {
            seen.insert(key.clone());
            match key.as_str() {
                KEY_MAX_CONCURRENT => match value.parse::<usize>() {
                    Ok(v) => settings.max_concurrent_downloads = v,
                    Err(_) => {
                        tracing::warn!(key = %key, value = %value, "Unparseable setting, using default");
                    }
                },
                KEY_DEFAULT_FOLDER => {
                    settings.default_download_folder = PathBuf::from(value);
                }
                KEY_CHUNK_SIZE => match value.parse::<usize>() {
                    Ok(v) => settings.chunk_size = v,
                    Err(_) => {
                        tracing::warn!(key = %key, value = %value, "Unparseable setting, using default");
                    }
                },
                KEY_NOTIFICATIONS => {
                    settings.notifications_enabled = value == "true";
                }
                _ => {
                    tracing::debug!(key = %key, "Ignoring unknown settings key");
                }
            }
        }

        // Seed keys that were missing so the table is complete after first run
        let all_seeded = [
            KEY_MAX_CONCURRENT,
            KEY_DEFAULT_FOLDER,
            KEY_CHUNK_SIZE,
            KEY_NOTIFICATIONS,
        ]
        .iter()
        .all(|k| seen.contains(*k));

        if !all_seeded {
            self.save_settings(&settings).await?;
        }

        Ok(settings)
    }

    /// Persist all settings in a single transaction
    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin settings transaction: {}",
                e
            )))
        })?;

        let pairs = [
            (
                KEY_MAX_CONCURRENT,
                settings.max_concurrent_downloads.to_string(),
            ),
            (
                KEY_DEFAULT_FOLDER,
                settings.default_download_folder.display().to_string(),
            ),
            (KEY_CHUNK_SIZE, settings.chunk_size.to_string()),
            (
                KEY_NOTIFICATIONS,
                if settings.notifications_enabled {
                    "true".to_string()
                } else {
                    "false".to_string()
                },
            ),
        ];

        for (key, value) in &pairs {
            sqlx::query(
                r#"
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET value = ?, updated_at = ?
                "#,
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to save setting {}: {}",
                    key, e
                )))
            })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit settings transaction: {}",
                e
            )))
        })?;

        Ok(())
    }
}
