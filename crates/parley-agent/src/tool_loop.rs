// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool-call loop controller.
//!
//! One chat turn is a sequence of provider rounds. Each round streams one
//! upstream response through the translator; a round that requested a
//! function call runs it locally and schedules another round with the
//! call and its output appended to the input. The loop ends when a round
//! requests no tool, when the turn is stopped or fails, or when the
//! iteration bound is reached.

use futures::StreamExt;
use parley_core::{
    AgentResponse, InputItem, Message, ParleyError, ProviderRequest, ResponseEventStream,
    ToolCallStatus, ToolStatus, TurnState,
};
use parley_skill::ToolRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Agent;
use crate::emitter::Emitter;
use crate::translator::{FunctionCall, Step, translate};

impl Agent {
    /// Runs provider rounds until the turn settles. Returns the number of
    /// rounds issued.
    pub(crate) async fn run_tool_loop(
        &self,
        turn: &mut TurnState,
        history: &[Message],
        emitter: &mut Emitter,
        cancel: &CancellationToken,
    ) -> usize {
        let max_iterations = self.settings.max_tool_iterations;
        let mut iterations = 0;

        loop {
            if cancel.is_cancelled() {
                turn.stop_processing();
                break;
            }
            iterations += 1;
            turn.begin_round();
            let request = self.build_request(turn, history);
            debug!(
                output_id = %turn.output_id,
                iteration = iterations,
                input_items = request.input.len(),
                "starting provider round"
            );

            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    turn.stop_processing();
                    break;
                }
                _ = emitter.client_gone() => {
                    client_gone(turn, cancel);
                    break;
                }
                opened = self.provider.stream(request) => opened,
            };
            let mut stream = match opened {
                Ok(stream) => stream,
                Err(e) => {
                    record_upstream_error(turn, emitter, e).await;
                    break;
                }
            };

            drain_round(&self.tools, turn, &mut stream, emitter, cancel).await;
            // Dropping the stream aborts the upstream request if it is still open.
            drop(stream);

            if turn.is_stop_processing() || turn.error.is_some() || !turn.is_function_calling {
                break;
            }
            if iterations >= max_iterations {
                let message = format!("maximum tool iterations ({max_iterations}) reached");
                warn!(output_id = %turn.output_id, "{message}");
                emitter.emit(AgentResponse::error(message)).await;
                break;
            }
        }

        if turn.is_stop_processing() {
            info!(output_id = %turn.output_id, iteration = iterations, "turn stopped");
        }
        iterations
    }

    /// Input is the durable history followed by this turn's tool items.
    pub(crate) fn build_request(&self, turn: &TurnState, history: &[Message]) -> ProviderRequest {
        let mut input: Vec<InputItem> = history
            .iter()
            .filter(|m| !m.content.is_empty())
            .map(InputItem::from)
            .collect();
        input.extend(turn.tool_messages.iter().cloned());

        let mut request = ProviderRequest::new(turn.model.clone(), input);
        if self.settings.web_search {
            request
                .tools
                .push(serde_json::json!({ "type": "web_search_preview" }));
        }
        request.tools.extend(self.tools.tool_definitions());
        request.stream = true;
        request
    }
}

/// Consumes one provider stream. Returns early on stop, cancellation,
/// stream failure, or a halting event.
async fn drain_round(
    tools: &ToolRegistry,
    turn: &mut TurnState,
    stream: &mut ResponseEventStream,
    emitter: &mut Emitter,
    cancel: &CancellationToken,
) {
    let mut frames = Vec::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                turn.stop_processing();
                return;
            }
            _ = emitter.client_gone() => {
                client_gone(turn, cancel);
                return;
            }
            next = stream.next() => next,
        };

        let event = match next {
            None => return,
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                record_upstream_error(turn, emitter, e).await;
                return;
            }
        };

        let step = translate(turn, event, &mut frames);
        emitter.emit_all(frames.drain(..)).await;
        match step {
            Step::Continue => {}
            Step::CallTool(call) => execute_call(tools, turn, call, emitter).await,
            Step::Halt => return,
        }
        if turn.is_stop_processing() {
            return;
        }
    }
}

/// Runs a completed function call and queues its output for the next round.
///
/// The call is reported `completed` before it runs so the client stops
/// showing "preparing". A failing tool does not end the loop; its error is
/// returned to the model as an incomplete output.
pub async fn execute_call(
    tools: &ToolRegistry,
    turn: &mut TurnState,
    call: FunctionCall,
    emitter: &mut Emitter,
) {
    let FunctionCall {
        call_id,
        name,
        arguments,
    } = call;

    turn.tool_messages.push(InputItem::FunctionCall {
        call_id: call_id.clone(),
        name: name.clone(),
        arguments: arguments.clone(),
    });
    emitter
        .emit(AgentResponse::tool(name.clone(), ToolStatus::Completed))
        .await;

    match tools.invoke(&name, &arguments).await {
        Ok(result) => {
            debug!(tool = %name, call_id = %call_id, "tool completed");
            turn.tool_messages.push(InputItem::FunctionCallOutput {
                call_id,
                output: result.to_string(),
                status: ToolCallStatus::Completed,
            });
            turn.update_tool_usage(&name);
        }
        Err(e) => {
            let message = e.to_string();
            warn!(tool = %name, call_id = %call_id, error = %message, "tool failed");
            turn.tool_messages.push(InputItem::FunctionCallOutput {
                call_id,
                output: serde_json::json!({ "error": message }).to_string(),
                status: ToolCallStatus::Incomplete,
            });
            emitter.emit(AgentResponse::error(message)).await;
            emitter
                .emit(AgentResponse::tool(name, ToolStatus::Completed))
                .await;
        }
    }
    turn.is_function_calling = true;
}

fn client_gone(turn: &mut TurnState, cancel: &CancellationToken) {
    debug!(output_id = %turn.output_id, "client disconnected, aborting upstream call");
    cancel.cancel();
    turn.stop_processing();
}

async fn record_upstream_error(turn: &mut TurnState, emitter: &mut Emitter, e: ParleyError) {
    warn!(output_id = %turn.output_id, error = %e, "provider stream failed");
    let message = e.to_string();
    turn.error = Some(message.clone());
    emitter.emit(AgentResponse::error(message)).await;
}
