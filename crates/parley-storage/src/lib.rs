// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for the Parley chat agent.
//!
//! A flat JSON key-value store (SQLite with embedded migrations, or
//! in-memory) plus the typed stores layered on it: conversation contexts,
//! summarized memory, and session records.

pub mod adapter;
pub mod context;
pub mod database;
pub mod kv;
pub mod memory;
pub mod memory_log;
pub mod migrations;
pub mod session;

use std::sync::Arc;

use parley_config::model::{StorageBackend, StorageConfig};
use parley_core::{KvStore, ParleyError};

pub use adapter::SqliteKvStore;
pub use context::ContextStore;
pub use database::Database;
pub use memory::MemoryKvStore;
pub use memory_log::{Memory, MemoryItem, MemoryLog};
pub use session::{SessionRecord, SessionStore};

/// Opens the configured backend, ready for use.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn KvStore>, ParleyError> {
    match config.backend {
        StorageBackend::Sqlite => {
            let store = SqliteKvStore::new(config.clone());
            store.initialize().await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryKvStore::new())),
    }
}
