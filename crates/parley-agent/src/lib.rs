// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn pipeline for the Parley chat agent.
//!
//! The [`Agent`] is the central coordinator that:
//! - Loads the caller's durable context and starts a turn
//! - Drives the provider through the tool-call loop, translating every
//!   stream event into normalized protocol frames
//! - Meters the turn and merges its output into the durable context
//! - Serializes turns per user and honours stop requests
//! - Summarizes aged conversation history into memory items

pub mod emitter;
pub mod finalize;
pub mod locks;
pub mod shutdown;
pub mod summarize;
pub mod tool_loop;
pub mod translator;

use std::sync::Arc;

use parley_config::ParleyConfig;
use parley_core::{
    AgentResponse, ChatRequest, Context, KvStore, Message, ParleyError, PluginAdapter,
    ResponsesProvider, TurnState, UserId, now_millis,
};
use parley_metering::{MeteringLedger, TokenCounter};
use parley_skill::ToolRegistry;
use parley_storage::{ContextStore, MemoryLog};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::emitter::Emitter;
use crate::locks::{ActiveTurns, UserLocks};

pub use summarize::SummaryGroup;
pub use translator::{FunctionCall, Step, translate};

const HOUR_MILLIS: i64 = 60 * 60 * 1000;

/// Tunables taken from the `[agent]`, `[openai]` and `[summarize]` sections.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub default_model: String,
    pub summary_model: String,
    pub max_tool_iterations: usize,
    pub web_search: bool,
    /// Messages older than this are summarized, in milliseconds.
    pub retention_millis: i64,
}

impl AgentSettings {
    pub fn from_config(config: &ParleyConfig) -> Self {
        Self {
            default_model: config.openai.default_model.clone(),
            summary_model: config.openai.summary_model.clone(),
            max_tool_iterations: config.agent.max_tool_iterations,
            web_search: config.agent.web_search,
            retention_millis: i64::try_from(config.summarize.retention_hours)
                .unwrap_or(i64::MAX / HOUR_MILLIS)
                .saturating_mul(HOUR_MILLIS),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&ParleyConfig::default())
    }
}

pub struct Agent {
    provider: Arc<dyn ResponsesProvider>,
    tools: Arc<ToolRegistry>,
    kv: Arc<dyn KvStore>,
    contexts: ContextStore,
    metering: MeteringLedger,
    memory: MemoryLog,
    tokens: TokenCounter,
    locks: UserLocks,
    active: ActiveTurns,
    settings: AgentSettings,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn ResponsesProvider>,
        kv: Arc<dyn KvStore>,
        tools: Arc<ToolRegistry>,
        settings: AgentSettings,
    ) -> Result<Self, ParleyError> {
        let tokens = TokenCounter::cl100k()?;
        info!(
            provider = provider.name(),
            storage = kv.name(),
            tools = tools.len(),
            model = %settings.default_model,
            "agent initialized"
        );
        Ok(Self {
            provider,
            tools,
            contexts: ContextStore::new(kv.clone()),
            metering: MeteringLedger::new(kv.clone()),
            memory: MemoryLog::new(kv.clone()),
            kv,
            tokens,
            locks: UserLocks::new(),
            active: ActiveTurns::new(),
            settings,
        })
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    /// Runs one chat turn, writing protocol frames to `events`.
    ///
    /// Never fails: every error surfaces as an `error` frame, and the final
    /// frame is always `end`. A second turn for the same user waits until
    /// this one has finished.
    pub async fn chat(
        &self,
        user: &UserId,
        request: ChatRequest,
        events: mpsc::Sender<AgentResponse>,
    ) {
        let _guard = self.locks.acquire(user).await;
        let cancel = self.active.register(user);
        let mut emitter = Emitter::new(events, cancel.clone());

        let model = request
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_model.clone());
        let mut turn = TurnState::init(uuid::Uuid::new_v4().to_string(), model, now_millis());

        info!(
            user_id = %user,
            output_id = %turn.output_id,
            model = %turn.model,
            "turn started"
        );

        let mut context = match self.contexts.get_current_context(user).await {
            Ok(context) => Some(context),
            Err(e) => {
                error!(user_id = %user, error = %e, "failed to load context");
                let message = format!("failed to load conversation: {e}");
                turn.error = Some(message.clone());
                emitter.emit(AgentResponse::error(message)).await;
                None
            }
        };

        let mut iterations = 0;
        if let Some(context) = context.as_mut() {
            context.put_message(Message::user(request.content, turn.timestamp));
            iterations = self
                .run_tool_loop(&mut turn, &context.messages, &mut emitter, &cancel)
                .await;
        }

        let usage = self
            .finalize(user, &mut turn, context.as_mut(), &mut emitter)
            .await;
        emitter.emit(AgentResponse::End).await;
        self.active.finish(user);

        info!(
            user_id = %user,
            output_id = %turn.output_id,
            input_tokens = usage.input,
            output_tokens = usage.output,
            total_tokens = usage.total,
            tool_usage = ?turn.tool_usage(),
            iterations,
            stopped = turn.is_stop_processing(),
            "turn complete"
        );
    }

    /// The durable message history of the user's current context.
    pub async fn messages(&self, user: &UserId) -> Result<Vec<Message>, ParleyError> {
        Ok(self.contexts.get_current_context(user).await?.messages)
    }

    /// The user's current context.
    pub async fn context(&self, user: &UserId) -> Result<Context, ParleyError> {
        self.contexts.get_current_context(user).await
    }

    /// Stops the user's in-flight turn. Returns whether one was running.
    pub fn stop(&self, user: &UserId) -> bool {
        let stopped = self.active.cancel(user);
        if stopped {
            info!(user_id = %user, "stop requested");
        }
        stopped
    }

    /// Number of turns currently running.
    pub fn active_turns(&self) -> usize {
        self.active.len()
    }
}
