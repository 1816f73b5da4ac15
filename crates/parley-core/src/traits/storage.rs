// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value persistence contract.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;

/// Flat JSON key-value store.
///
/// Keys are namespaced by prefix (`context/`, `memory/`, `metering/`,
/// `session/`). There are no transactions or compare-and-swap; concurrent
/// writers get last-write-wins.
#[async_trait]
pub trait KvStore: PluginAdapter {
    /// Returns the stored value, or `None` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, ParleyError>;

    /// Writes `value` under `key`. Returns whether the write was applied.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<bool, ParleyError>;
}
