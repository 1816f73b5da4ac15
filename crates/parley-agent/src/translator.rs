// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream translator: provider events in, normalized protocol frames out.
//!
//! [`translate`] handles exactly one [`ResponseStreamEvent`]. It mutates the
//! turn accumulator, appends any frames to `out`, and tells the caller what
//! to do next. It never performs I/O; executing a requested function call is
//! the tool loop's job.

use parley_core::{
    AGENT_TOOL, AgentInfo, AgentResponse, AgentType, ContentPart, ContentType, OutputItem,
    ResponseMeta, ResponseStreamEvent, ToolStatus, TurnState, WEB_SEARCH_TOOL, now_millis,
};
use tracing::{debug, warn};

/// A completed function call item awaiting local execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

/// What the caller should do after an event has been translated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Keep consuming the stream.
    Continue,
    /// Run the function call, then keep consuming.
    CallTool(FunctionCall),
    /// Stop consuming this provider call.
    Halt,
}

pub fn translate(
    turn: &mut TurnState,
    event: ResponseStreamEvent,
    out: &mut Vec<AgentResponse>,
) -> Step {
    match event {
        ResponseStreamEvent::Created { response } => {
            let model = if response.model.is_empty() {
                turn.model.clone()
            } else {
                response.model
            };
            let info = AgentInfo {
                agent_type: Some(AgentType::OpenAi),
                id: Some(turn.output_id.clone()),
                model: Some(model),
                ..AgentInfo::default()
            };
            turn.info = Some(info.clone());
            out.push(AgentResponse::Begin {
                info,
                timestamp: turn.timestamp,
            });
            Step::Continue
        }

        ResponseStreamEvent::InProgress { .. } => {
            out.push(AgentResponse::tool(AGENT_TOOL, ToolStatus::Prepare));
            Step::Continue
        }

        ResponseStreamEvent::OutputItemAdded { item, .. } => match item {
            OutputItem::WebSearchCall { id, status } => {
                if turn.observe_web_search(&id) {
                    warn!(search_id = %id, "repeated web search in one turn, stopping");
                    turn.stop_processing();
                    return Step::Halt;
                }
                out.push(AgentResponse::tool(
                    WEB_SEARCH_TOOL,
                    ToolStatus::from_provider(status.as_deref()),
                ));
                Step::Continue
            }
            OutputItem::FunctionCall { name, .. } => {
                out.push(AgentResponse::tool(name, ToolStatus::Prepare));
                Step::Continue
            }
            OutputItem::Message { .. } | OutputItem::Other => Step::Continue,
        },

        ResponseStreamEvent::ContentPartAdded { content_index, .. } => {
            let index = turn.slot_index(content_index);
            turn.ensure_slot(index);
            turn.update_last_content_index(index);
            out.push(AgentResponse::Add {
                content_index: index,
            });
            Step::Continue
        }

        ResponseStreamEvent::OutputTextDelta {
            content_index,
            delta,
            ..
        } => {
            let index = turn.slot_index(content_index);
            let Some(message) = turn.processing_messages.get_mut(index) else {
                out.push(invalid_index(index));
                return Step::Continue;
            };
            message.content.push_str(&delta);
            message.content_index = Some(index);
            turn.update_last_content_index(index);
            out.push(AgentResponse::Delta {
                content: delta,
                content_index: index,
            });
            Step::Continue
        }

        ResponseStreamEvent::ContentPartDone {
            content_index,
            part,
            ..
        } => {
            let index = turn.slot_index(content_index);
            let info = turn.info.clone();
            let Some(message) = turn.processing_messages.get_mut(index) else {
                out.push(invalid_index(index));
                return Step::Continue;
            };
            if let Some(text) = part_text(&part) {
                message.content = text.to_string();
            }
            let timestamp = now_millis();
            message.content_type = Some(ContentType::Text);
            message.content_index = Some(index);
            message.info = info.clone();
            message.timestamp = Some(timestamp);
            out.push(AgentResponse::Finalize {
                content_type: ContentType::Text,
                content_index: index,
                content: message.content.clone(),
                info,
                timestamp,
            });
            turn.update_last_content_index(index);
            Step::Continue
        }

        ResponseStreamEvent::OutputItemDone { item, .. } => match item {
            OutputItem::WebSearchCall { status, .. } => {
                out.push(AgentResponse::tool(
                    WEB_SEARCH_TOOL,
                    ToolStatus::from_provider(status.as_deref()),
                ));
                turn.update_tool_usage(WEB_SEARCH_TOOL);
                Step::Continue
            }
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
                ..
            } => Step::CallTool(FunctionCall {
                call_id,
                name,
                arguments,
            }),
            OutputItem::Message { .. } | OutputItem::Other => Step::Continue,
        },

        ResponseStreamEvent::Failed { response } => {
            upstream_failure(turn, failure_message(&response), out)
        }

        ResponseStreamEvent::Error { code, message } => {
            let message = match code {
                Some(code) => format!("{message} ({code})"),
                None => message,
            };
            upstream_failure(turn, message, out)
        }

        ResponseStreamEvent::Completed { .. } | ResponseStreamEvent::Other => Step::Continue,
    }
}

fn invalid_index(index: usize) -> AgentResponse {
    debug!(content_index = index, "event references an unassembled slot");
    AgentResponse::error(format!("invalid content index {index}"))
}

/// The authoritative text of a finished part. Empty parts keep the
/// accumulated deltas.
fn part_text(part: &ContentPart) -> Option<&str> {
    part.text().filter(|text| !text.is_empty())
}

fn failure_message(response: &ResponseMeta) -> String {
    response
        .error
        .as_ref()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| "response failed".to_string())
}

fn upstream_failure(turn: &mut TurnState, message: String, out: &mut Vec<AgentResponse>) -> Step {
    warn!(error = %message, "provider reported a failure");
    turn.error = Some(message.clone());
    out.push(AgentResponse::error(message));
    Step::Halt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn() -> TurnState {
        TurnState::init("out-1", "gpt-4o-mini", 1_000)
    }

    fn created() -> ResponseStreamEvent {
        ResponseStreamEvent::Created {
            response: ResponseMeta {
                id: "resp_1".into(),
                model: "gpt-4o-mini-2024".into(),
                ..ResponseMeta::default()
            },
        }
    }

    fn part_added(i: usize) -> ResponseStreamEvent {
        ResponseStreamEvent::ContentPartAdded {
            item_id: None,
            content_index: i,
            part: ContentPart::OutputText {
                text: String::new(),
            },
        }
    }

    fn delta(i: usize, text: &str) -> ResponseStreamEvent {
        ResponseStreamEvent::OutputTextDelta {
            item_id: None,
            content_index: i,
            delta: text.into(),
        }
    }

    fn part_done(i: usize, text: &str) -> ResponseStreamEvent {
        ResponseStreamEvent::ContentPartDone {
            item_id: None,
            content_index: i,
            part: ContentPart::OutputText { text: text.into() },
        }
    }

    fn web_search_added(id: &str) -> ResponseStreamEvent {
        ResponseStreamEvent::OutputItemAdded {
            output_index: 0,
            item: OutputItem::WebSearchCall {
                id: id.into(),
                status: Some("in_progress".into()),
            },
        }
    }

    fn run(turn: &mut TurnState, events: Vec<ResponseStreamEvent>) -> (Vec<AgentResponse>, Vec<Step>) {
        let mut out = Vec::new();
        let steps = events
            .into_iter()
            .map(|event| translate(turn, event, &mut out))
            .collect();
        (out, steps)
    }

    #[test]
    fn created_emits_begin_and_captures_info() {
        let mut t = turn();
        let (out, _) = run(&mut t, vec![created()]);
        let info = t.info.clone().unwrap();
        assert_eq!(info.id.as_deref(), Some("out-1"));
        assert_eq!(info.model.as_deref(), Some("gpt-4o-mini-2024"));
        assert_eq!(info.agent_type, Some(AgentType::OpenAi));
        assert_eq!(
            out,
            vec![AgentResponse::Begin {
                info,
                timestamp: 1_000
            }]
        );
    }

    #[test]
    fn in_progress_reports_agent_preparing() {
        let mut t = turn();
        let (out, _) = run(
            &mut t,
            vec![ResponseStreamEvent::InProgress {
                response: ResponseMeta::default(),
            }],
        );
        assert_eq!(out, vec![AgentResponse::tool(AGENT_TOOL, ToolStatus::Prepare)]);
    }

    #[test]
    fn text_part_lifecycle() {
        let mut t = turn();
        let (out, steps) = run(
            &mut t,
            vec![created(), part_added(0), delta(0, "Hel"), delta(0, "lo"), part_done(0, "Hello")],
        );
        assert!(steps.iter().all(|s| *s == Step::Continue));
        assert_eq!(out[1], AgentResponse::Add { content_index: 0 });
        assert_eq!(
            out[2],
            AgentResponse::Delta {
                content: "Hel".into(),
                content_index: 0
            }
        );
        match &out[4] {
            AgentResponse::Finalize {
                content,
                content_index,
                info,
                ..
            } => {
                assert_eq!(content, "Hello");
                assert_eq!(*content_index, 0);
                assert!(info.is_some());
            }
            other => panic!("expected finalize, got {other:?}"),
        }
        assert_eq!(t.processing_messages.len(), 1);
        assert_eq!(t.processing_messages[0].content, "Hello");
        assert_eq!(t.processing_messages[0].content_index, Some(0));
        assert_eq!(t.last_content_index(), Some(0));
    }

    #[test]
    fn part_added_pads_missing_slots() {
        let mut t = turn();
        let (out, _) = run(&mut t, vec![part_added(2)]);
        assert_eq!(out, vec![AgentResponse::Add { content_index: 2 }]);
        assert_eq!(t.processing_messages.len(), 3);
        assert_eq!(t.last_content_index(), Some(2));
    }

    #[test]
    fn delta_beyond_buffer_is_an_error_and_mutates_nothing() {
        let mut t = turn();
        let (out, steps) = run(&mut t, vec![delta(3, "x")]);
        assert_eq!(out, vec![AgentResponse::error("invalid content index 3")]);
        assert_eq!(steps, vec![Step::Continue]);
        assert!(t.processing_messages.is_empty());
        assert_eq!(t.last_content_index(), None);
    }

    #[test]
    fn finalize_beyond_buffer_is_an_error() {
        let mut t = turn();
        let (out, _) = run(&mut t, vec![part_added(0), part_done(1, "late")]);
        assert_eq!(out[1], AgentResponse::error("invalid content index 1"));
        assert_eq!(t.processing_messages[0].content, "");
    }

    #[test]
    fn empty_done_part_keeps_streamed_text() {
        let mut t = turn();
        let (out, _) = run(&mut t, vec![part_added(0), delta(0, "abc"), part_done(0, "")]);
        assert!(matches!(&out[2], AgentResponse::Finalize { content, .. } if content == "abc"));
    }

    #[test]
    fn second_round_indices_are_offset() {
        let mut t = turn();
        run(&mut t, vec![part_added(0), delta(0, "first"), part_done(0, "first")]);
        t.begin_round();
        let (out, _) = run(&mut t, vec![part_added(0), delta(0, "second")]);
        assert_eq!(out[0], AgentResponse::Add { content_index: 1 });
        assert_eq!(t.processing_messages[1].content, "second");
        assert_eq!(t.processing_messages[0].content, "first");
    }

    #[test]
    fn web_search_lifecycle_counts_usage() {
        let mut t = turn();
        let (out, _) = run(
            &mut t,
            vec![
                web_search_added("ws_1"),
                ResponseStreamEvent::OutputItemDone {
                    output_index: 0,
                    item: OutputItem::WebSearchCall {
                        id: "ws_1".into(),
                        status: Some("completed".into()),
                    },
                },
            ],
        );
        assert_eq!(
            out,
            vec![
                AgentResponse::tool(WEB_SEARCH_TOOL, ToolStatus::InProgress),
                AgentResponse::tool(WEB_SEARCH_TOOL, ToolStatus::Completed),
            ]
        );
        assert_eq!(t.tool_usage()[WEB_SEARCH_TOOL], 1);
    }

    #[test]
    fn repeated_web_search_after_output_halts() {
        let mut t = turn();
        let (_, steps) = run(
            &mut t,
            vec![
                web_search_added("ws_1"),
                part_added(0),
                delta(0, "answer"),
                web_search_added("ws_2"),
            ],
        );
        assert_eq!(steps.last(), Some(&Step::Halt));
        assert!(t.is_stop_processing());
    }

    #[test]
    fn first_search_after_unrelated_output_continues() {
        let mut t = turn();
        let (out, steps) = run(&mut t, vec![part_added(0), web_search_added("ws_1")]);
        assert_eq!(steps, vec![Step::Continue, Step::Continue]);
        assert!(!t.is_stop_processing());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn function_call_added_then_done_requests_execution() {
        let mut t = turn();
        let (out, steps) = run(
            &mut t,
            vec![
                ResponseStreamEvent::OutputItemAdded {
                    output_index: 0,
                    item: OutputItem::FunctionCall {
                        id: Some("fc_1".into()),
                        call_id: "call_1".into(),
                        name: "dateTime".into(),
                        arguments: String::new(),
                        status: Some("in_progress".into()),
                    },
                },
                ResponseStreamEvent::OutputItemDone {
                    output_index: 0,
                    item: OutputItem::FunctionCall {
                        id: Some("fc_1".into()),
                        call_id: "call_1".into(),
                        name: "dateTime".into(),
                        arguments: r#"{"timeZone":"UTC"}"#.into(),
                        status: Some("completed".into()),
                    },
                },
            ],
        );
        assert_eq!(out, vec![AgentResponse::tool("dateTime", ToolStatus::Prepare)]);
        assert_eq!(
            steps[1],
            Step::CallTool(FunctionCall {
                call_id: "call_1".into(),
                name: "dateTime".into(),
                arguments: r#"{"timeZone":"UTC"}"#.into(),
            })
        );
    }

    #[test]
    fn provider_error_event_halts_and_records() {
        let mut t = turn();
        let (out, steps) = run(
            &mut t,
            vec![ResponseStreamEvent::Error {
                code: Some("rate_limit_exceeded".into()),
                message: "slow down".into(),
            }],
        );
        assert_eq!(steps, vec![Step::Halt]);
        assert_eq!(out, vec![AgentResponse::error("slow down (rate_limit_exceeded)")]);
        assert_eq!(t.error.as_deref(), Some("slow down (rate_limit_exceeded)"));
    }

    #[test]
    fn unknown_events_are_silent() {
        let mut t = turn();
        let (out, steps) = run(
            &mut t,
            vec![
                ResponseStreamEvent::Other,
                ResponseStreamEvent::Completed {
                    response: ResponseMeta::default(),
                },
            ],
        );
        assert!(out.is_empty());
        assert_eq!(steps, vec![Step::Continue, Step::Continue]);
    }
}
