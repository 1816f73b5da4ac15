// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user append-only metering log at `metering/{userId}`.
//!
//! One record is appended per completed turn, whatever way the turn ended.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use parley_core::{KvStore, ParleyError, TokenUsage, ToolUsage, UserId, now_millis};
use parley_storage::kv;

pub const METERING_PREFIX: &str = "metering/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeteringRecord {
    #[serde(default)]
    pub token_usage: Option<TokenUsage>,
    #[serde(default)]
    pub tool_usage: Option<ToolUsage>,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
}

impl MeteringRecord {
    /// A record spanning from `start_timestamp` to now.
    pub fn new(token_usage: TokenUsage, tool_usage: ToolUsage, start_timestamp: i64) -> Self {
        Self {
            token_usage: Some(token_usage),
            tool_usage: Some(tool_usage),
            start_timestamp,
            end_timestamp: now_millis(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metering {
    #[serde(default)]
    pub metering_items: Vec<MeteringRecord>,
}

impl Metering {
    /// Token usage summed over every record.
    pub fn total_tokens(&self) -> TokenUsage {
        let (input, output) = self
            .metering_items
            .iter()
            .filter_map(|r| r.token_usage)
            .fold((0, 0), |(i, o), u| (i + u.input, o + u.output));
        TokenUsage::new(input, output)
    }

    /// Invocation counts summed per tool.
    pub fn total_tool_usage(&self) -> ToolUsage {
        let mut totals = ToolUsage::new();
        for usage in self.metering_items.iter().filter_map(|r| r.tool_usage.as_ref()) {
            for (name, count) in usage {
                *totals.entry(name.clone()).or_insert(0) += count;
            }
        }
        totals
    }
}

#[derive(Clone)]
pub struct MeteringLedger {
    kv: Arc<dyn KvStore>,
}

impl MeteringLedger {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn get(&self, user_id: &UserId) -> Result<Metering, ParleyError> {
        Ok(kv::load(self.kv.as_ref(), &key(user_id)).await?.unwrap_or_default())
    }

    /// Appends one record. Read-modify-write; concurrent appends for the same
    /// user must be serialized by the caller.
    pub async fn record(
        &self,
        user_id: &UserId,
        record: MeteringRecord,
    ) -> Result<bool, ParleyError> {
        let mut metering = self.get(user_id).await?;
        if let Some(usage) = record.token_usage {
            info!(
                user_id = %user_id,
                input = usage.input,
                output = usage.output,
                total = usage.total,
                "metering recorded"
            );
        }
        metering.metering_items.push(record);
        kv::save(self.kv.as_ref(), &key(user_id), &metering).await
    }
}

fn key(user_id: &UserId) -> String {
    format!("{METERING_PREFIX}{user_id}")
}
