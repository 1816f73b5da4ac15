// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation data model.
//!
//! [`Context`] is the durable per-user record written to the KV store.
//! [`TurnState`] is the scratch accumulator for one chat turn; it has no serde
//! impls and is dropped once the turn is merged into the context.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::protocol::{AgentInfo, ContentType, ToolUsage};
use crate::responses::InputItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageType {
    System,
    Agent,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<AgentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Message {
    pub fn new(message_type: MessageType, content: impl Into<String>) -> Self {
        Self {
            message_type,
            content: content.into(),
            content_type: None,
            content_index: None,
            info: None,
            timestamp: None,
        }
    }

    pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::new(MessageType::User, content)
        }
    }

    /// An empty agent slot waiting for streamed text.
    pub fn placeholder() -> Self {
        Self::new(MessageType::Agent, "")
    }
}

/// Durable conversation state for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<AgentInfo>,
}

impl Context {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            info: None,
        }
    }

    pub fn put_message(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// Turn-scoped accumulator.
///
/// Owned exclusively by the running turn and threaded by `&mut` through the
/// translator, the tool loop, and finalization.
#[derive(Debug)]
pub struct TurnState {
    pub output_id: String,
    pub model: String,
    pub timestamp: i64,
    pub info: Option<AgentInfo>,
    pub processing_messages: Vec<Message>,
    pub tool_messages: Vec<InputItem>,
    pub is_function_calling: bool,
    pub error: Option<String>,
    last_content_index: Option<usize>,
    is_stop_processing: bool,
    tool_usage: ToolUsage,
    seen_tool_calls: HashSet<String>,
    web_search_seen: bool,
    content_base: usize,
}

impl TurnState {
    /// Starts a fresh turn. Durable messages live on [`Context`] and are not touched.
    pub fn init(output_id: impl Into<String>, model: impl Into<String>, timestamp: i64) -> Self {
        Self {
            output_id: output_id.into(),
            model: model.into(),
            timestamp,
            info: None,
            processing_messages: Vec::new(),
            tool_messages: Vec::new(),
            is_function_calling: false,
            error: None,
            last_content_index: None,
            is_stop_processing: false,
            tool_usage: ToolUsage::new(),
            seen_tool_calls: HashSet::new(),
            web_search_seen: false,
            content_base: 0,
        }
    }

    /// Resets per-round flags before the next upstream call.
    ///
    /// Content indices of the new round are offset past every slot already
    /// produced so rounds never overwrite each other.
    pub fn begin_round(&mut self) {
        self.is_function_calling = false;
        self.content_base = self.processing_messages.len();
    }

    /// Maps a provider content index onto a turn-wide slot index.
    pub fn slot_index(&self, provider_index: usize) -> usize {
        self.content_base + provider_index
    }

    pub fn put_processing_message(&mut self, message: Message) {
        self.processing_messages.push(message);
    }

    /// Pads the processing buffer with placeholders until `index` is addressable.
    pub fn ensure_slot(&mut self, index: usize) {
        while self.processing_messages.len() <= index {
            self.processing_messages.push(Message::placeholder());
        }
    }

    pub fn last_content_index(&self) -> Option<usize> {
        self.last_content_index
    }

    /// Raises the high-water mark; lower values are ignored.
    pub fn update_last_content_index(&mut self, index: usize) {
        self.last_content_index = Some(match self.last_content_index {
            Some(current) => current.max(index),
            None => index,
        });
    }

    pub fn stop_processing(&mut self) {
        self.is_stop_processing = true;
    }

    pub fn is_stop_processing(&self) -> bool {
        self.is_stop_processing
    }

    /// Increments the invocation count for `name`, starting at one.
    pub fn update_tool_usage(&mut self, name: &str) {
        *self.tool_usage.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn tool_usage(&self) -> &ToolUsage {
        &self.tool_usage
    }

    /// Records a web search item and reports whether it repeats one this turn.
    ///
    /// A repeat is an id already seen, or any further search once output exists.
    pub fn observe_web_search(&mut self, id: &str) -> bool {
        let repeated = !id.is_empty() && self.seen_tool_calls.contains(id);
        let anomalous = self.web_search_seen && !self.processing_messages.is_empty();
        if !id.is_empty() {
            self.seen_tool_calls.insert(id.to_string());
        }
        self.web_search_seen = true;
        repeated || anomalous
    }
}
