// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parser for Responses API streams.
//!
//! Each SSE record's `data` is a JSON object whose `type` field selects the
//! [`ResponseStreamEvent`] variant, so the SSE `event:` line is not consulted.

use eventsource_stream::Eventsource;
use futures::stream::StreamExt;

use parley_core::{ParleyError, ResponseEventStream, ResponseStreamEvent};

/// Decodes a streaming response body into typed events.
///
/// Kinds the pipeline does not handle decode to [`ResponseStreamEvent::Other`];
/// a `[DONE]` sentinel is skipped.
pub fn parse_sse_stream(response: reqwest::Response) -> ResponseEventStream {
    let events = response
        .bytes_stream()
        .eventsource()
        .filter_map(|result| async move {
            match result {
                Ok(event) if event.data.trim() == "[DONE]" => None,
                Ok(event) => Some(decode_event(&event.data)),
                Err(e) => Some(Err(ParleyError::Provider {
                    message: format!("SSE stream error: {e}"),
                    source: None,
                })),
            }
        });
    Box::pin(events)
}

fn decode_event(data: &str) -> Result<ResponseStreamEvent, ParleyError> {
    serde_json::from_str(data).map_err(|e| ParleyError::Provider {
        message: format!("failed to parse stream event: {e}"),
        source: Some(Box::new(e)),
    })
}
