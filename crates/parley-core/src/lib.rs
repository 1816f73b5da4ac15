// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley chat agent.
//!
//! Holds the error type, the normalized client protocol, the conversation
//! data model, the upstream Responses wire types, and the adapter traits
//! every backend implements.

pub mod context;
pub mod error;
pub mod protocol;
pub mod responses;
pub mod traits;
pub mod types;

pub use context::{Context, Message, MessageType, TurnState};
pub use error::ParleyError;
pub use protocol::{
    AGENT_TOOL, AgentInfo, AgentResponse, AgentType, ChatRequest, ContentType, TokenUsage, ToolState,
    ToolStatus, ToolUsage, WEB_SEARCH_TOOL,
};
pub use responses::{
    ContentPart, InputItem, InputRole, OutputItem, ProviderRequest, ProviderResponse,
    ResponseMeta, ResponseStreamEvent, ToolCallStatus,
};
pub use traits::{KvStore, PluginAdapter, ResponseEventStream, ResponsesProvider};
pub use types::{AdapterType, HealthStatus, UserId, now_millis};
