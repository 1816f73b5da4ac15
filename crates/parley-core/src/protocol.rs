// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized client protocol.
//!
//! Every frame on the chat SSE stream is `data: <json>\n\n` where the JSON is
//! one [`AgentResponse`]. The vocabulary is independent of the upstream
//! provider's native event shape, so clients only ever see these eight kinds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Invocation counts keyed by tool name.
pub type ToolUsage = BTreeMap<String, u64>;

/// Token accounting for one turn. `total` is always `input + output`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub total: u64,
    pub input: u64,
    pub output: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            total: input + output,
            input,
            output,
        }
    }
}

/// Which provider family produced a run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentType {
    #[default]
    OpenAi,
}

/// Run metadata attached to messages and protocol frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<AgentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_usage: Option<ToolUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Media,
}

/// Display status of a tool (or the synthetic `agent` pseudo-tool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Prepare,
    InProgress,
    Completed,
    Unknown,
}

impl ToolStatus {
    /// Maps a provider item status onto the client vocabulary.
    pub fn from_provider(status: Option<&str>) -> Self {
        match status {
            Some("in_progress") => ToolStatus::InProgress,
            Some("completed") => ToolStatus::Completed,
            _ => ToolStatus::Unknown,
        }
    }
}

/// Name of the pseudo-tool representing "the agent is thinking".
pub const AGENT_TOOL: &str = "agent";

/// Name under which hosted web search calls are reported and metered.
pub const WEB_SEARCH_TOOL: &str = "web_search_call";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolState {
    #[serde(rename = "type")]
    pub name: String,
    pub status: ToolStatus,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub content: String,
}

/// One frame of the normalized protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum AgentResponse {
    Begin {
        info: AgentInfo,
        timestamp: i64,
    },
    Add {
        content_index: usize,
    },
    Delta {
        content: String,
        content_index: usize,
    },
    Finalize {
        content_type: ContentType,
        content_index: usize,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        info: Option<AgentInfo>,
        timestamp: i64,
    },
    Info {
        info: AgentInfo,
    },
    Tool {
        tool: ToolState,
    },
    Error {
        error_message: String,
    },
    End,
}

impl AgentResponse {
    pub fn tool(name: impl Into<String>, status: ToolStatus) -> Self {
        AgentResponse::Tool {
            tool: ToolState {
                name: name.into(),
                status,
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        AgentResponse::Error {
            error_message: message.into(),
        }
    }

    /// Wire name of this frame's event.
    pub fn event_name(&self) -> &'static str {
        match self {
            AgentResponse::Begin { .. } => "begin",
            AgentResponse::Add { .. } => "add",
            AgentResponse::Delta { .. } => "delta",
            AgentResponse::Finalize { .. } => "finalize",
            AgentResponse::Info { .. } => "info",
            AgentResponse::Tool { .. } => "tool",
            AgentResponse::Error { .. } => "error",
            AgentResponse::End => "end",
        }
    }

    /// Encodes the frame as a complete SSE `data:` record.
    pub fn to_sse_frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}
