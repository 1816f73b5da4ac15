// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory items produced by summarization, at `memory/{userId}`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use parley_core::{KvStore, ParleyError, UserId};

use crate::kv;

pub const MEMORY_PREFIX: &str = "memory/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    #[serde(default)]
    pub memory_items: Vec<MemoryItem>,
}

#[derive(Clone)]
pub struct MemoryLog {
    kv: Arc<dyn KvStore>,
}

impl MemoryLog {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn load(&self, user_id: &UserId) -> Result<Memory, ParleyError> {
        Ok(kv::load(self.kv.as_ref(), &format!("{MEMORY_PREFIX}{user_id}"))
            .await?
            .unwrap_or_default())
    }

    /// Appends items to the user's memory.
    pub async fn put_items(
        &self,
        user_id: &UserId,
        items: Vec<MemoryItem>,
    ) -> Result<bool, ParleyError> {
        let mut memory = self.load(user_id).await?;
        memory.memory_items.extend(items);
        kv::save(self.kv.as_ref(), &format!("{MEMORY_PREFIX}{user_id}"), &memory).await
    }
}
