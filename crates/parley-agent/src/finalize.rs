// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn finalization: metering and the merge into durable context.
//!
//! Runs once per turn however the tool loop ended. Persistence failures
//! are logged and reported to the client but never abort the turn.

use parley_core::{
    AgentInfo, AgentResponse, AgentType, ContentType, Context, Message, MessageType,
    TokenUsage, TurnState, UserId, now_millis,
};
use parley_metering::MeteringRecord;
use tracing::error;

use crate::Agent;
use crate::emitter::Emitter;

/// Text of the agent message synthesized when a turn produced no output.
pub fn fallback_message(error: Option<&str>) -> String {
    match error {
        Some(error) => format!("Sorry, I could not complete a response. ({error})"),
        None => "Sorry, I could not complete a response.".to_string(),
    }
}

impl Agent {
    /// Meters the turn, emits the closing frames except `end`, and persists.
    ///
    /// `context` is `None` when it could not be loaded; the turn is then
    /// metered but nothing is merged.
    pub(crate) async fn finalize(
        &self,
        user: &UserId,
        turn: &mut TurnState,
        context: Option<&mut Context>,
        emitter: &mut Emitter,
    ) -> TokenUsage {
        let prior: &[Message] = context.as_deref().map_or(&[], |c| c.messages.as_slice());
        let token_usage = self.tokens.usage(prior, &turn.processing_messages);
        let tool_usage = turn.tool_usage().clone();

        let run_info = turn.info.clone().unwrap_or_else(|| AgentInfo {
            agent_type: Some(AgentType::OpenAi),
            id: Some(turn.output_id.clone()),
            model: Some(turn.model.clone()),
            ..AgentInfo::default()
        });
        let info = AgentInfo {
            token_usage: Some(token_usage),
            tool_usage: Some(tool_usage.clone()),
            ..run_info.clone()
        };

        if turn.processing_messages.is_empty() {
            let index = turn.last_content_index().map_or(0, |i| i + 1);
            let content = fallback_message(turn.error.as_deref());
            let timestamp = now_millis();
            emitter
                .emit(AgentResponse::Add {
                    content_index: index,
                })
                .await;
            emitter
                .emit(AgentResponse::Finalize {
                    content_type: ContentType::Text,
                    content_index: index,
                    content: content.clone(),
                    info: Some(info.clone()),
                    timestamp,
                })
                .await;
            turn.put_processing_message(Message {
                content_type: Some(ContentType::Text),
                content_index: Some(index),
                timestamp: Some(timestamp),
                ..Message::new(MessageType::Agent, content)
            });
            turn.update_last_content_index(index);
        }

        // Slots cut off by a failure or stop still owe the client a finalize.
        let now = now_millis();
        for (index, message) in turn.processing_messages.iter_mut().enumerate() {
            message.info = Some(info.clone());
            message.content_type.get_or_insert(ContentType::Text);
            message.content_index.get_or_insert(index);
            if message.timestamp.is_none() {
                message.timestamp = Some(now);
                emitter
                    .emit(AgentResponse::Finalize {
                        content_type: ContentType::Text,
                        content_index: index,
                        content: message.content.clone(),
                        info: Some(info.clone()),
                        timestamp: now,
                    })
                    .await;
            }
        }
        emitter.emit(AgentResponse::Info { info }).await;

        let record = MeteringRecord::new(token_usage, tool_usage, turn.timestamp);
        if let Err(e) = self.metering.record(user, record).await {
            error!(user_id = %user, error = %e, "failed to record metering");
            emitter
                .emit(AgentResponse::error(format!("failed to record usage: {e}")))
                .await;
        }

        if let Some(context) = context {
            context.messages.append(&mut turn.processing_messages);
            context.info = Some(run_info);
            if let Err(e) = self.contexts.put_context(context).await {
                error!(user_id = %user, context_id = %context.id, error = %e, "failed to persist context");
                emitter
                    .emit(AgentResponse::error(format!("failed to save conversation: {e}")))
                    .await;
            }
        }

        token_usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_mentions_error_when_known() {
        assert_eq!(
            fallback_message(Some("provider error: boom")),
            "Sorry, I could not complete a response. (provider error: boom)"
        );
        assert_eq!(fallback_message(None), "Sorry, I could not complete a response.");
    }
}
