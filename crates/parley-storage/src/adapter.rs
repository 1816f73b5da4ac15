// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed [`KvStore`].

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use tokio::sync::OnceCell;
use tracing::debug;

use parley_config::model::StorageConfig;
use parley_core::{AdapterType, HealthStatus, KvStore, ParleyError, PluginAdapter};

use crate::database::{Database, map_tr_err};

/// Stores each key as one row of JSON text. Writes are upserts, so the last
/// writer wins.
pub struct SqliteKvStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteKvStore {
    /// The database is not opened until [`initialize`](Self::initialize).
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Opens the database and applies migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), ParleyError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ParleyError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "sqlite kv store initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, ParleyError> {
        self.db.get().ok_or_else(|| ParleyError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteKvStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, ParleyError> {
        let key = key.to_string();
        let raw = self
            .db()?
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()
            })
            .await
            .map_err(map_tr_err)?;

        raw.map(|text| serde_json::from_str(&text).map_err(ParleyError::storage))
            .transpose()
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<bool, ParleyError> {
        let key = key.to_string();
        let text = serde_json::to_string(&value).map_err(ParleyError::storage)?;
        let now = chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        let changed = self
            .db()?
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                    updated_at = excluded.updated_at",
                    params![key, text, now],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_config::model::StorageBackend;
    use serde_json::json;
    use tempfile::tempdir;

    fn make_config(path: &std::path::Path) -> StorageConfig {
        StorageConfig {
            backend: StorageBackend::Sqlite,
            database_path: path.to_string_lossy().into_owned(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn identity() {
        let dir = tempdir().unwrap();
        let store = SqliteKvStore::new(make_config(&dir.path().join("kv.db")));
        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/data/kv.db");
        let store = SqliteKvStore::new(make_config(&path));
        store.initialize().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn initialize_twice_fails() {
        let dir = tempdir().unwrap();
        let store = SqliteKvStore::new(make_config(&dir.path().join("kv.db")));
        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let store = SqliteKvStore::new(make_config(&dir.path().join("kv.db")));
        assert!(store.health_check().await.is_err());
        assert!(store.get("context/x").await.is_err());
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let dir = tempdir().unwrap();
        let store = SqliteKvStore::new(make_config(&dir.path().join("kv.db")));
        store.initialize().await.unwrap();
        assert_eq!(store.get("context/nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let dir = tempdir().unwrap();
        let store = SqliteKvStore::new(make_config(&dir.path().join("kv.db")));
        store.initialize().await.unwrap();

        assert!(store.set("metering/u", json!({"n": 1})).await.unwrap());
        assert!(store.set("metering/u", json!({"n": 2})).await.unwrap());
        assert_eq!(store.get("metering/u").await.unwrap(), Some(json!({"n": 2})));
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.db");
        {
            let store = SqliteKvStore::new(make_config(&path));
            store.initialize().await.unwrap();
            store.set("session/u", json!({"clientIp": "10.0.0.1"})).await.unwrap();
            store.shutdown().await.unwrap();
        }
        let store = SqliteKvStore::new(make_config(&path));
        store.initialize().await.unwrap();
        assert_eq!(
            store.get("session/u").await.unwrap(),
            Some(json!({"clientIp": "10.0.0.1"}))
        );
    }

    #[tokio::test]
    async fn health_check_is_healthy_once_open() {
        let dir = tempdir().unwrap();
        let store = SqliteKvStore::new(make_config(&dir.path().join("kv.db")));
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
