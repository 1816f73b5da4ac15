// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock Responses provider for deterministic testing.
//!
//! Every `stream` call pops one scripted [`MockRound`] from a FIFO queue;
//! every `complete` call pops one queued response. When a queue is empty a
//! default "mock response" text is returned. Requests are recorded for
//! assertions.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tokio::sync::Mutex;

use parley_core::{
    AdapterType, ContentPart, HealthStatus, OutputItem, ParleyError, PluginAdapter,
    ProviderRequest, ProviderResponse, ResponseEventStream, ResponseMeta, ResponseStreamEvent,
    ResponsesProvider,
};

/// Script for one upstream streaming call.
#[derive(Debug, Clone)]
pub enum MockRound {
    /// Events delivered in order; `Err` items surface as stream failures.
    Events(Vec<Result<ResponseStreamEvent, String>>),
    /// The call itself fails before any event.
    Refuse(String),
    /// Events delivered, then the stream hangs until dropped.
    Stall(Vec<ResponseStreamEvent>),
}

/// Counts streams dropped before they ended.
struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockProvider {
    rounds: Arc<Mutex<VecDeque<MockRound>>>,
    completions: Arc<Mutex<VecDeque<ProviderResponse>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    stalled_dropped: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            rounds: Arc::new(Mutex::new(VecDeque::new())),
            completions: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            stalled_dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues a round that succeeds with the given events.
    pub async fn push_round(&self, events: Vec<ResponseStreamEvent>) {
        self.push(MockRound::Events(events.into_iter().map(Ok).collect()))
            .await;
    }

    /// Queues a round whose stream fails after `events`.
    pub async fn push_stream_failure(&self, events: Vec<ResponseStreamEvent>, message: &str) {
        let mut items: Vec<_> = events.into_iter().map(Ok).collect();
        items.push(Err(message.to_string()));
        self.push(MockRound::Events(items)).await;
    }

    /// Queues a round that hangs after `events` until the consumer drops it.
    pub async fn push_stall(&self, events: Vec<ResponseStreamEvent>) {
        self.push(MockRound::Stall(events)).await;
    }

    pub async fn push(&self, round: MockRound) {
        self.rounds.lock().await.push_back(round);
    }

    /// Queues a non-streaming response carrying `text` as its output.
    pub async fn push_completion_text(&self, text: &str) {
        self.completions
            .lock()
            .await
            .push_back(completion("mock-model", text));
    }

    /// Every request received so far, streaming or not.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of stalled streams the consumer dropped.
    pub fn stalled_dropped(&self) -> usize {
        self.stalled_dropped.load(Ordering::SeqCst)
    }

    async fn next_round(&self) -> MockRound {
        self.rounds
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockRound::Events(text_round("mock response").into_iter().map(Ok).collect()))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn provider_error(message: String) -> ParleyError {
    ParleyError::Provider {
        message,
        source: None,
    }
}

fn meta(status: &str) -> ResponseMeta {
    ResponseMeta {
        id: "resp_mock".to_string(),
        model: "mock-model".to_string(),
        status: Some(status.to_string()),
        error: None,
    }
}

fn completion(model: &str, text: &str) -> ProviderResponse {
    ProviderResponse {
        id: "resp_mock".to_string(),
        model: model.to_string(),
        output: vec![OutputItem::Message {
            id: Some("msg_mock".to_string()),
            content: vec![ContentPart::OutputText {
                text: text.to_string(),
            }],
        }],
    }
}

fn message_events(text: &str, output_index: usize) -> Vec<ResponseStreamEvent> {
    let item = OutputItem::Message {
        id: Some("msg_mock".to_string()),
        content: Vec::new(),
    };
    vec![
        ResponseStreamEvent::OutputItemAdded {
            output_index,
            item: item.clone(),
        },
        ResponseStreamEvent::ContentPartAdded {
            item_id: Some("msg_mock".to_string()),
            content_index: 0,
            part: ContentPart::OutputText {
                text: String::new(),
            },
        },
        ResponseStreamEvent::OutputTextDelta {
            item_id: Some("msg_mock".to_string()),
            content_index: 0,
            delta: text.to_string(),
        },
        ResponseStreamEvent::ContentPartDone {
            item_id: Some("msg_mock".to_string()),
            content_index: 0,
            part: ContentPart::OutputText {
                text: text.to_string(),
            },
        },
        ResponseStreamEvent::OutputItemDone { output_index, item },
    ]
}

/// A complete round answering with one text part.
pub fn text_round(text: &str) -> Vec<ResponseStreamEvent> {
    let mut events = vec![
        ResponseStreamEvent::Created {
            response: meta("in_progress"),
        },
        ResponseStreamEvent::InProgress {
            response: meta("in_progress"),
        },
    ];
    events.extend(message_events(text, 0));
    events.push(ResponseStreamEvent::Completed {
        response: meta("completed"),
    });
    events
}

/// A complete round that requests one function call and no text.
pub fn function_call_round(call_id: &str, name: &str, arguments: &str) -> Vec<ResponseStreamEvent> {
    let item = |status: &str| OutputItem::FunctionCall {
        id: Some(format!("fc_{call_id}")),
        call_id: call_id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
        status: Some(status.to_string()),
    };
    vec![
        ResponseStreamEvent::Created {
            response: meta("in_progress"),
        },
        ResponseStreamEvent::InProgress {
            response: meta("in_progress"),
        },
        ResponseStreamEvent::OutputItemAdded {
            output_index: 0,
            item: item("in_progress"),
        },
        ResponseStreamEvent::OutputItemDone {
            output_index: 0,
            item: item("completed"),
        },
        ResponseStreamEvent::Completed {
            response: meta("completed"),
        },
    ]
}

/// A complete round that runs a hosted web search, then answers with text.
pub fn web_search_round(search_id: &str, text: &str) -> Vec<ResponseStreamEvent> {
    let item = |status: &str| OutputItem::WebSearchCall {
        id: search_id.to_string(),
        status: Some(status.to_string()),
    };
    let mut events = vec![
        ResponseStreamEvent::Created {
            response: meta("in_progress"),
        },
        ResponseStreamEvent::InProgress {
            response: meta("in_progress"),
        },
        ResponseStreamEvent::OutputItemAdded {
            output_index: 0,
            item: item("in_progress"),
        },
        ResponseStreamEvent::OutputItemDone {
            output_index: 0,
            item: item("completed"),
        },
    ];
    events.extend(message_events(text, 1));
    events.push(ResponseStreamEvent::Completed {
        response: meta("completed"),
    });
    events
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ResponsesProvider for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError> {
        let model = request.model.clone();
        self.requests.lock().await.push(request);
        Ok(self
            .completions
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| completion(&model, "mock response")))
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ResponseEventStream, ParleyError> {
        self.requests.lock().await.push(request);
        match self.next_round().await {
            MockRound::Refuse(message) => Err(provider_error(message)),
            MockRound::Events(items) => Ok(Box::pin(stream::iter(
                items.into_iter().map(|item| item.map_err(provider_error)),
            ))),
            MockRound::Stall(events) => {
                let counter = DropCounter(self.stalled_dropped.clone());
                let events = stream::iter(events.into_iter().map(Ok)).chain(stream::pending());
                Ok(Box::pin(events.map(move |event| {
                    let _held = &counter;
                    event
                })))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn request() -> ProviderRequest {
        ProviderRequest::new("test-model", Vec::new())
    }

    #[tokio::test]
    async fn default_round_when_queue_empty() {
        let provider = MockProvider::new();
        let events: Vec<_> = provider.stream(request()).await.unwrap().collect().await;
        assert_eq!(events.len(), text_round("mock response").len());
        assert!(events.iter().all(Result::is_ok));
        assert_eq!(provider.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn queued_rounds_play_in_order() {
        let provider = MockProvider::new();
        provider
            .push_round(function_call_round("call_1", "dateTime", "{}"))
            .await;
        provider.push(MockRound::Refuse("upstream down".into())).await;

        let first: Vec<_> = provider.stream(request()).await.unwrap().collect().await;
        assert_eq!(first.len(), 5);
        let err = provider.stream(request()).await.err().unwrap();
        assert!(err.to_string().contains("upstream down"));
    }

    #[tokio::test]
    async fn stream_failure_is_last_item() {
        let provider = MockProvider::new();
        provider.push_stream_failure(Vec::new(), "reset").await;
        let items: Vec<_> = provider.stream(request()).await.unwrap().collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[tokio::test]
    async fn dropping_stalled_stream_is_counted() {
        let provider = MockProvider::new();
        provider.push_stall(text_round("partial")[..2].to_vec()).await;
        let mut stream = provider.stream(request()).await.unwrap();
        assert!(stream.next().await.is_some());
        assert_eq!(provider.stalled_dropped(), 0);
        drop(stream);
        assert_eq!(provider.stalled_dropped(), 1);
    }

    #[tokio::test]
    async fn completions_fall_back_to_default_text() {
        let provider = MockProvider::new();
        provider.push_completion_text("{\"summary_list\":[]}").await;
        let first = provider.complete(request()).await.unwrap();
        assert_eq!(first.output_text(), "{\"summary_list\":[]}");
        let second = provider.complete(request()).await.unwrap();
        assert_eq!(second.output_text(), "mock response");
        assert_eq!(second.model, "test-model");
    }
}
