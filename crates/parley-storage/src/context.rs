// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable per-user conversation contexts.
//!
//! A context lives at `context/{id}`; the user's current context id lives at
//! `context/current/{userId}`. Both are created lazily on first access.

use std::sync::Arc;

use tracing::{debug, warn};

use parley_core::{Context, KvStore, ParleyError, UserId};

use crate::kv;

pub const CONTEXT_PREFIX: &str = "context/";

fn context_key(id: &str) -> String {
    format!("{CONTEXT_PREFIX}{id}")
}

fn current_key(user_id: &UserId) -> String {
    format!("{CONTEXT_PREFIX}current/{user_id}")
}

#[derive(Clone)]
pub struct ContextStore {
    kv: Arc<dyn KvStore>,
}

impl ContextStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    /// Returns the user's context, creating and registering an empty one if absent.
    pub async fn get_current_context(&self, user_id: &UserId) -> Result<Context, ParleyError> {
        let mapping = current_key(user_id);
        if let Some(id) = kv::load::<String>(self.kv.as_ref(), &mapping).await? {
            if let Some(context) = self.get_context(&id).await? {
                return Ok(context);
            }
            warn!(user_id = %user_id, context_id = %id, "context mapping is dangling, recreating");
            let context = Context::new(id);
            self.put_context(&context).await?;
            return Ok(context);
        }

        let context = Context::new(uuid::Uuid::new_v4().to_string());
        self.put_context(&context).await?;
        kv::save(self.kv.as_ref(), &mapping, &context.id).await?;
        debug!(user_id = %user_id, context_id = %context.id, "created context");
        Ok(context)
    }

    pub async fn get_context(&self, id: &str) -> Result<Option<Context>, ParleyError> {
        kv::load(self.kv.as_ref(), &context_key(id)).await
    }

    /// Writes the context unconditionally; concurrent writers get last-write-wins.
    pub async fn put_context(&self, context: &Context) -> Result<bool, ParleyError> {
        kv::save(self.kv.as_ref(), &context_key(&context.id), context).await
    }
}
