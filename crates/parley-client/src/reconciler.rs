// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rebuilds the visible conversation from the chat event stream.
//!
//! The [`Reconciler`] keeps a local mirror of the durable messages plus the
//! in-flight turn. Slots for the turn live at `last_index + contentIndex`,
//! where `last_index` is the boundary committed after the previous turn.
//! It performs no I/O; the driver in [`crate::client`] feeds it raw bytes.

use std::time::Duration;

use parley_core::{
    AGENT_TOOL, AgentResponse, ChatRequest, Message, MessageType, ParleyError,
    ToolState, ToolStatus, WEB_SEARCH_TOOL,
};
use tracing::{debug, warn};

/// Wait before committing local state after a transport failure.
pub const RECOVERY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStatus {
    Init,
    Loading,
    Ready,
    Processing,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    messages: Vec<Message>,
    last_index: usize,
    tools: Vec<ToolState>,
    status: ChatStatus,
    pending: Vec<u8>,
    user_slot: Option<usize>,
    notices: Vec<String>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            last_index: 0,
            tools: Vec::new(),
            status: ChatStatus::Init,
            pending: Vec::new(),
            user_slot: None,
            notices: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_index(&self) -> usize {
        self.last_index
    }

    pub fn status(&self) -> ChatStatus {
        self.status
    }

    /// Current tool-status map in arrival order.
    pub fn tool_status(&self) -> &[ToolState] {
        &self.tools
    }

    /// Human-readable labels for tools still worth showing.
    pub fn tool_labels(&self) -> Vec<String> {
        self.tools
            .iter()
            .filter_map(|t| tool_label(&t.name, t.status))
            .collect()
    }

    /// Drains the user-visible notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn begin_loading(&mut self) {
        self.status = ChatStatus::Loading;
    }

    /// Installs the durable history and commits it as the turn boundary.
    pub fn load(&mut self, messages: Vec<Message>) {
        self.last_index = messages.len();
        self.messages = messages;
        self.status = ChatStatus::Ready;
    }

    pub fn load_failed(&mut self, error: &ParleyError) {
        self.notice(format!("failed to load context: {error}"));
    }

    /// Appends the user's message and moves into `processing`.
    ///
    /// Only one turn may be in flight; blank content is rejected.
    pub fn send(
        &mut self,
        content: &str,
        model: Option<String>,
    ) -> Result<ChatRequest, ParleyError> {
        if self.status != ChatStatus::Ready {
            return Err(ParleyError::Protocol(format!(
                "cannot send while {:?}",
                self.status
            )));
        }
        if content.trim().is_empty() {
            return Err(ParleyError::Protocol("content must not be empty".into()));
        }

        self.messages.push(Message::new(MessageType::User, content));
        self.user_slot = Some(self.messages.len() - 1);
        self.last_index = self.messages.len();
        self.pending.clear();
        self.status = ChatStatus::Processing;
        Ok(ChatRequest {
            model,
            content: content.to_string(),
        })
    }

    /// Consumes one chunk of the SSE body.
    ///
    /// Complete lines are processed immediately; a trailing partial line is
    /// held until the next chunk. Returns the frames applied.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<AgentResponse> {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        let mut applied = Vec::new();
        for line in complete.split(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(line);
            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            match serde_json::from_str::<AgentResponse>(payload.trim()) {
                Ok(frame) => {
                    self.apply(&frame);
                    applied.push(frame);
                }
                Err(e) => {
                    warn!(error = %e, "dropping undecodable frame");
                    self.notice(format!("invalid frame: {e}"));
                }
            }
        }
        applied
    }

    /// Applies one decoded frame to the mirror.
    pub fn apply(&mut self, frame: &AgentResponse) {
        debug!(event = frame.event_name(), "applying frame");
        match frame {
            AgentResponse::Begin { timestamp, .. } => {
                if let Some(message) = self.user_slot.and_then(|i| self.messages.get_mut(i)) {
                    message.timestamp = Some(*timestamp);
                }
            }
            AgentResponse::Add { content_index } => {
                self.tools.clear();
                while self.messages.len() <= self.last_index + content_index {
                    self.messages.push(Message::placeholder());
                }
            }
            AgentResponse::Delta {
                content,
                content_index,
            } => match self.messages.get_mut(self.last_index + content_index) {
                Some(message) => message.content.push_str(content),
                None => self.notice(format!("invalid content delta with index: {content_index}")),
            },
            AgentResponse::Finalize {
                content_type,
                content_index,
                content,
                info,
                timestamp,
            } => match self.messages.get_mut(self.last_index + content_index) {
                Some(message) => {
                    message.content = content.clone();
                    message.content_type = Some(*content_type);
                    message.content_index = Some(*content_index);
                    message.info = info.clone();
                    message.timestamp = Some(*timestamp);
                }
                None => {
                    self.notice(format!("invalid content finalize with index: {content_index}"))
                }
            },
            AgentResponse::Info { info } => {
                for message in self.messages.iter_mut().skip(self.last_index) {
                    message.info = Some(info.clone());
                }
            }
            AgentResponse::Tool { tool } => self.merge_tool(tool),
            AgentResponse::Error { error_message } => {
                if !error_message.is_empty() {
                    self.notice(error_message.clone());
                }
            }
            AgentResponse::End => self.commit(),
        }
    }

    /// The response body ended. A partial trailing line is discarded.
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            debug!(bytes = self.pending.len(), "discarding unterminated line");
            self.pending.clear();
        }
        self.user_slot = None;
        self.status = ChatStatus::Ready;
    }

    pub fn fail(&mut self, error: &ParleyError) {
        self.notice(format!("failed to process message: {error}"));
    }

    /// Commits whatever the mirror holds after a transport failure.
    pub fn recover(&mut self) {
        self.pending.clear();
        self.commit();
    }

    fn commit(&mut self) {
        self.last_index = self.messages.len();
        self.tools.clear();
        self.user_slot = None;
        self.status = ChatStatus::Ready;
    }

    fn merge_tool(&mut self, tool: &ToolState) {
        match self.tools.iter_mut().find(|t| t.name == tool.name) {
            Some(existing) => existing.status = tool.status,
            None => self.tools.push(tool.clone()),
        }
        if self.tools.len() > 1
            && let Some(agent) = self.tools.iter_mut().find(|t| t.name == AGENT_TOOL)
        {
            agent.status = ToolStatus::Completed;
        }
    }

    fn notice(&mut self, message: String) {
        self.notices.push(message);
    }
}

/// Label shown for a tool in the given state, if any.
pub fn tool_label(name: &str, status: ToolStatus) -> Option<String> {
    match (name, status) {
        (_, ToolStatus::Completed | ToolStatus::Unknown) => None,
        (AGENT_TOOL, _) => Some("Preparing ...".to_string()),
        (WEB_SEARCH_TOOL, ToolStatus::InProgress) => Some("Web Searching ...".to_string()),
        (WEB_SEARCH_TOOL, _) => None,
        (_, ToolStatus::Prepare) => Some(format!("Preparing {} ...", camel_case_to_words(name))),
        (_, ToolStatus::InProgress) => {
            Some(format!("Processing {} ...", camel_case_to_words(name)))
        }
    }
}

/// `drawChart` becomes `Draw Chart`.
fn camel_case_to_words(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for (i, c) in name.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
        } else {
            if prev_lower && c.is_ascii_uppercase() {
                out.push(' ');
            }
            out.push(c);
        }
        prev_lower = c.is_ascii_lowercase();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{AgentInfo, ContentType};

    fn ready_with(messages: Vec<Message>) -> Reconciler {
        let mut r = Reconciler::new();
        r.begin_loading();
        r.load(messages);
        r
    }

    fn frame(json: &str) -> Vec<u8> {
        format!("data: {json}\n\n").into_bytes()
    }

    #[test]
    fn load_commits_boundary() {
        let r = ready_with(vec![
            Message::new(MessageType::User, "hi"),
            Message::new(MessageType::Agent, "hello"),
        ]);
        assert_eq!(r.status(), ChatStatus::Ready);
        assert_eq!(r.last_index(), 2);
    }

    #[test]
    fn send_requires_ready_and_content() {
        let mut r = Reconciler::new();
        assert!(r.send("hi", None).is_err());

        let mut r = ready_with(Vec::new());
        assert!(r.send("   ", None).is_err());
        let request = r.send("hi", Some("gpt-4o".into())).unwrap();
        assert_eq!(request.content, "hi");
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(r.status(), ChatStatus::Processing);
        assert_eq!(r.last_index(), 1);
        assert!(r.send("again", None).is_err());
    }

    #[test]
    fn full_turn_builds_agent_message() {
        let mut r = ready_with(Vec::new());
        r.send("hi", None).unwrap();

        let mut body = Vec::new();
        body.extend(frame(r#"{"event":"begin","info":{"type":"openai","id":"o1","model":"m"},"timestamp":42}"#));
        body.extend(frame(r#"{"event":"tool","tool":{"type":"agent","status":"prepare"}}"#));
        body.extend(frame(r#"{"event":"add","contentIndex":0}"#));
        body.extend(frame(r#"{"event":"delta","content":"Hel","contentIndex":0}"#));
        body.extend(frame(r#"{"event":"delta","content":"lo","contentIndex":0}"#));
        body.extend(frame(
            r#"{"event":"finalize","contentType":"text","contentIndex":0,"content":"Hello","timestamp":50}"#,
        ));
        body.extend(frame(
            r#"{"event":"info","info":{"model":"m","tokenUsage":{"total":3,"input":1,"output":2}}}"#,
        ));
        body.extend(frame(r#"{"event":"end"}"#));

        let applied = r.feed(&body);
        assert_eq!(applied.len(), 8);
        r.finish();

        let messages = r.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].timestamp, Some(42));
        assert_eq!(messages[1].content, "Hello");
        assert_eq!(messages[1].timestamp, Some(50));
        assert_eq!(
            messages[1].info.as_ref().and_then(|i| i.token_usage).map(|u| u.total),
            Some(3)
        );
        assert_eq!(r.last_index(), 2);
        assert_eq!(r.status(), ChatStatus::Ready);
        assert!(r.tool_status().is_empty());
        assert!(r.take_notices().is_empty());
    }

    #[test]
    fn partial_lines_wait_for_next_chunk() {
        let mut r = ready_with(Vec::new());
        r.send("hi", None).unwrap();

        assert!(r.feed(b"data: {\"event\":\"add\",\"con").is_empty());
        assert!(r.messages().len() == 1);
        let applied = r.feed(b"tentIndex\":0}\n\n");
        assert_eq!(applied, vec![AgentResponse::Add { content_index: 0 }]);
        assert_eq!(r.messages().len(), 2);
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let mut r = ready_with(Vec::new());
        r.send("hi", None).unwrap();
        let applied = r.feed(b": keep-alive\nevent: message\nid: 7\n\n");
        assert!(applied.is_empty());
        assert!(r.take_notices().is_empty());
    }

    #[test]
    fn out_of_range_delta_raises_notice() {
        let mut r = ready_with(Vec::new());
        r.send("hi", None).unwrap();
        r.feed(&frame(r#"{"event":"delta","content":"x","contentIndex":3}"#));
        assert_eq!(r.messages().len(), 1);
        assert_eq!(r.take_notices(), vec!["invalid content delta with index: 3"]);

        r.feed(&frame(
            r#"{"event":"finalize","contentType":"text","contentIndex":1,"content":"x","timestamp":1}"#,
        ));
        assert_eq!(r.take_notices(), vec!["invalid content finalize with index: 1"]);
    }

    #[test]
    fn add_pads_relative_to_boundary() {
        let mut r = ready_with(vec![
            Message::new(MessageType::User, "a"),
            Message::new(MessageType::Agent, "b"),
        ]);
        r.send("c", None).unwrap();
        r.apply(&AgentResponse::Add { content_index: 1 });
        assert_eq!(r.messages().len(), 5);
        r.apply(&AgentResponse::Delta {
            content: "second".into(),
            content_index: 1,
        });
        assert_eq!(r.messages()[4].content, "second");
        assert_eq!(r.messages()[3].content, "");
    }

    #[test]
    fn info_backfills_only_current_turn() {
        let mut r = ready_with(vec![Message::new(MessageType::Agent, "old")]);
        r.send("new", None).unwrap();
        r.apply(&AgentResponse::Add { content_index: 0 });
        let info = AgentInfo {
            model: Some("m".into()),
            ..AgentInfo::default()
        };
        r.apply(&AgentResponse::Info { info: info.clone() });
        assert_eq!(r.messages()[0].info, None);
        assert_eq!(r.messages()[1].info.as_ref(), Some(&info));
        assert_eq!(r.messages()[2].info.as_ref(), Some(&info));
    }

    #[test]
    fn agent_tool_completes_once_other_tools_appear() {
        let mut r = ready_with(Vec::new());
        r.send("hi", None).unwrap();
        r.apply(&AgentResponse::tool(AGENT_TOOL, ToolStatus::Prepare));
        assert_eq!(r.tool_labels(), vec!["Preparing ..."]);

        r.apply(&AgentResponse::tool("drawChart", ToolStatus::Prepare));
        assert_eq!(r.tool_labels(), vec!["Preparing Draw Chart ..."]);
        assert_eq!(r.tool_status()[0].status, ToolStatus::Completed);

        r.apply(&AgentResponse::tool(WEB_SEARCH_TOOL, ToolStatus::InProgress));
        r.apply(&AgentResponse::tool("drawChart", ToolStatus::Completed));
        assert_eq!(r.tool_labels(), vec!["Web Searching ..."]);

        r.apply(&AgentResponse::Add { content_index: 0 });
        assert!(r.tool_status().is_empty());
    }

    #[test]
    fn error_frames_notify_without_touching_messages() {
        let mut r = ready_with(Vec::new());
        r.send("hi", None).unwrap();
        r.apply(&AgentResponse::error("kaboom"));
        r.apply(&AgentResponse::error(""));
        assert_eq!(r.take_notices(), vec!["kaboom"]);
        assert_eq!(r.messages().len(), 1);
    }

    #[test]
    fn undecodable_frame_is_dropped_with_notice() {
        let mut r = ready_with(Vec::new());
        r.send("hi", None).unwrap();
        let applied = r.feed(b"data: {not json}\n\ndata: {\"event\":\"end\"}\n\n");
        assert_eq!(applied, vec![AgentResponse::End]);
        assert_eq!(r.take_notices().len(), 1);
        assert_eq!(r.status(), ChatStatus::Ready);
    }

    #[test]
    fn recover_commits_partial_turn() {
        let mut r = ready_with(Vec::new());
        r.send("hi", None).unwrap();
        r.apply(&AgentResponse::Add { content_index: 0 });
        r.apply(&AgentResponse::Delta {
            content: "half".into(),
            content_index: 0,
        });
        r.fail(&ParleyError::Gateway {
            message: "connection reset".into(),
            source: None,
        });
        r.recover();
        assert_eq!(r.status(), ChatStatus::Ready);
        assert_eq!(r.last_index(), 2);
        assert_eq!(r.messages()[1].content, "half");
        assert!(r.take_notices()[0].starts_with("failed to process message"));
    }

    #[test]
    fn labels_for_statuses() {
        assert_eq!(tool_label(AGENT_TOOL, ToolStatus::Completed), None);
        assert_eq!(tool_label(WEB_SEARCH_TOOL, ToolStatus::Unknown), None);
        assert_eq!(
            tool_label("dateTime", ToolStatus::InProgress).as_deref(),
            Some("Processing Date Time ...")
        );
        assert_eq!(camel_case_to_words("echo"), "Echo");
    }

    #[test]
    fn finalize_fills_fields() {
        let mut r = ready_with(Vec::new());
        r.send("hi", None).unwrap();
        r.apply(&AgentResponse::Add { content_index: 0 });
        r.apply(&AgentResponse::Finalize {
            content_type: ContentType::Text,
            content_index: 0,
            content: "done".into(),
            info: None,
            timestamp: 9,
        });
        let m = &r.messages()[1];
        assert_eq!(m.content_index, Some(0));
        assert_eq!(m.content_type, Some(ContentType::Text));
    }
}
