// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed access to the JSON key-value store.

use serde::Serialize;
use serde::de::DeserializeOwned;

use parley_core::{KvStore, ParleyError};

/// Reads and decodes `key`. A never-written key is `Ok(None)`.
pub async fn load<T: DeserializeOwned>(
    kv: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, ParleyError> {
    match kv.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(ParleyError::storage),
        None => Ok(None),
    }
}

/// Encodes and writes `value` under `key`.
pub async fn save<T: Serialize>(
    kv: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<bool, ParleyError> {
    let value = serde_json::to_value(value).map_err(ParleyError::storage)?;
    kv.set(key, value).await
}
