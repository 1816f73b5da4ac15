// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation summarization.
//!
//! Aged user/agent exchanges are grouped by topic through a structured
//! completion, stored as memory items, and trimmed from the durable
//! context so it stays bounded.

use parley_core::{
    ContentPart, InputItem, InputRole, Message, MessageType, OutputItem, ParleyError,
    ProviderRequest, ProviderResponse, UserId, now_millis,
};
use parley_storage::MemoryItem;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Agent;

pub const SUMMARY_PROMPT: &str = r#"Your task is to analyze messages, group and summarize them by topics.

Basic Rules:
- Each message consists of a user's question and an agent's answer.
- Group related messages that discuss the same topic.
- For each group:
  - Write a summary that accurately reflects the key points.
  - Add tags, which must be meaningful keywords relevant to the topic.
  - Add related message indices which starts from 0.

Tagging Guidelines:
1. Include important named entities and keywords in the tags:
   - Product or service names (e.g. OpenAI, React, GPT-4)
   - Libraries, APIs, or technical tools (e.g. JSON Schema, useEffect)
   - Topics or task categories (e.g. Scrolling, Authentication, Validation)
2. Use 2 to 5 tags per group, prioritizing specificity over generality.
3. Avoid vague or generic tags like "question", "info", or "topic".

Special Rule:
- If a group's topic is trivial or factual (e.g. current time, weather, definitions), add the tag "!ignore".

Language Rule:
- Write each summary in the language used by the majority of messages in that group."#;

/// One topic group returned by the summary model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryGroup {
    pub summary: String,
    /// Positions in the list of pairs sent for summarization.
    pub indices: Vec<usize>,
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
struct SummaryList {
    summary_list: Vec<SummaryGroup>,
}

/// A user question and the agent answer that followed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationPair {
    pub user: Option<String>,
    pub agent: String,
    pub timestamp: Option<i64>,
}

/// Pairs every agent message with the user message directly before it.
pub fn collect_pairs(messages: &[Message]) -> Vec<ConversationPair> {
    let mut pairs = Vec::new();
    let mut pending_user = None;
    for message in messages {
        match message.message_type {
            MessageType::User => pending_user = Some(message.content.clone()),
            MessageType::Agent => pairs.push(ConversationPair {
                user: pending_user.take(),
                agent: message.content.clone(),
                timestamp: message.timestamp,
            }),
            MessageType::System => {}
        }
    }
    pairs
}

/// Pairs strictly older than the retention window. Untimed pairs never expire.
pub fn select_expired(
    pairs: Vec<ConversationPair>,
    now: i64,
    retention_millis: i64,
) -> Vec<ConversationPair> {
    pairs
        .into_iter()
        .filter(|p| p.timestamp.is_some_and(|ts| now - ts > retention_millis))
        .collect()
}

/// Messages kept after summarization.
///
/// Everything goes when even the newest message has aged out. Otherwise the
/// tail starting at the first message inside the window is kept, extended
/// back to the user message that opened its exchange.
pub fn remaining_messages(messages: &[Message], now: i64, retention_millis: i64) -> Vec<Message> {
    let newest = messages.iter().filter_map(|m| m.timestamp).max().unwrap_or(0);
    if now - newest > retention_millis {
        return Vec::new();
    }
    let Some(first_recent) = messages
        .iter()
        .position(|m| m.timestamp.is_some_and(|ts| now - ts <= retention_millis))
    else {
        return Vec::new();
    };
    let start = messages[..=first_recent]
        .iter()
        .rposition(|m| m.message_type == MessageType::User)
        .unwrap_or(0);
    messages[start..].to_vec()
}

/// Converts groups to memory items spanning their referenced pairs.
pub fn memory_items(groups: &[SummaryGroup], pairs: &[ConversationPair]) -> Vec<MemoryItem> {
    groups
        .iter()
        .map(|group| {
            let mut item = MemoryItem {
                content: group.summary.clone(),
                tags: group.tags.clone(),
                start_timestamp: None,
                end_timestamp: None,
            };
            for &index in &group.indices {
                let Some(pair) = pairs.get(index) else {
                    warn!(index, pairs = pairs.len(), "summary referenced unknown message index");
                    continue;
                };
                if item.start_timestamp.is_none() {
                    item.start_timestamp = pair.timestamp;
                }
                item.end_timestamp = pair.timestamp;
            }
            item
        })
        .collect()
}

/// Extracts groups from every text output. Malformed outputs are skipped.
pub fn parse_groups(response: &ProviderResponse) -> Vec<SummaryGroup> {
    let mut groups = Vec::new();
    for item in &response.output {
        let OutputItem::Message { content, .. } = item else {
            warn!(?item, "ignoring non-message summary output");
            continue;
        };
        for part in content {
            let ContentPart::OutputText { text } = part else {
                warn!(?part, "ignoring non-text summary content");
                continue;
            };
            match serde_json::from_str::<SummaryList>(text) {
                Ok(list) => groups.extend(list.summary_list),
                Err(e) => warn!(error = %e, "failed to parse summary output"),
            }
        }
    }
    groups
}

/// Structured output format requested from the summary model.
pub fn summary_format() -> serde_json::Value {
    serde_json::json!({
        "format": {
            "type": "json_schema",
            "name": "conversation_summary",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "summary_list": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "summary": {
                                    "type": "string",
                                    "description": "The summary of specific topic group."
                                },
                                "indices": {
                                    "type": "array",
                                    "items": { "type": "integer" },
                                    "description": "Message indices of specific topic group."
                                },
                                "tags": {
                                    "type": "array",
                                    "items": { "type": "string" },
                                    "description": "The tags of specific topic group."
                                }
                            },
                            "required": ["summary", "indices", "tags"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["summary_list"],
                "additionalProperties": false
            }
        }
    })
}

impl Agent {
    /// Summarizes aged exchanges into memory and trims the context.
    ///
    /// Returns the groups produced, or an empty list when nothing has aged
    /// out. Holds the user's turn lock throughout.
    pub async fn summarize(&self, user: &UserId) -> Result<Vec<SummaryGroup>, ParleyError> {
        let _guard = self.locks.acquire(user).await;
        let now = now_millis();
        let retention = self.settings.retention_millis;

        let mut context = self.contexts.get_current_context(user).await?;
        let pairs = select_expired(collect_pairs(&context.messages), now, retention);
        if pairs.is_empty() {
            debug!(user_id = %user, "nothing to summarize");
            return Ok(Vec::new());
        }

        let payload = serde_json::to_string(&pairs)
            .map_err(|e| ParleyError::Internal(format!("failed to encode summary input: {e}")))?;
        let mut request = ProviderRequest::new(
            self.settings.summary_model.clone(),
            vec![InputItem::Message {
                role: InputRole::User,
                content: payload,
            }],
        );
        request.instructions = Some(SUMMARY_PROMPT.to_string());
        request.text = Some(summary_format());

        let response = self.provider.complete(request).await?;
        let groups = parse_groups(&response);

        let items = memory_items(&groups, &pairs);
        let item_count = items.len();
        self.memory.put_items(user, items).await?;

        let before = context.messages.len();
        context.messages = remaining_messages(&context.messages, now, retention);
        self.contexts.put_context(&context).await?;

        info!(
            user_id = %user,
            pairs = pairs.len(),
            groups = groups.len(),
            memory_items = item_count,
            trimmed = before - context.messages.len(),
            "conversation summarized"
        );
        Ok(groups)
    }
}
