// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Last-seen records for authenticated users, at `session/{userId}`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use parley_core::{KvStore, ParleyError, UserId, now_millis};

use crate::kv;

pub const SESSION_PREFIX: &str = "session/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub client_ip: Option<String>,
    pub last_seen: i64,
}

#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Records that `user_id` was just seen from `client_ip`.
    pub async fn touch(
        &self,
        user_id: &UserId,
        client_ip: Option<String>,
    ) -> Result<bool, ParleyError> {
        let record = SessionRecord {
            client_ip,
            last_seen: now_millis(),
        };
        kv::save(self.kv.as_ref(), &format!("{SESSION_PREFIX}{user_id}"), &record).await
    }

    pub async fn get(&self, user_id: &UserId) -> Result<Option<SessionRecord>, ParleyError> {
        kv::load(self.kv.as_ref(), &format!("{SESSION_PREFIX}{user_id}")).await
    }
}
