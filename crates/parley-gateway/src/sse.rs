// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events streaming for `POST /chat`.
//!
//! The turn runs in its own task and writes protocol frames into a bounded
//! channel; the response body drains it. Each frame is one `data:` record
//! holding the JSON-encoded frame:
//!
//! ```text
//! data: {"event":"delta","content":"Hel","contentIndex":0}
//!
//! data: {"event":"end"}
//! ```
//!
//! Dropping the body (client disconnect) closes the channel, which the turn
//! observes as a stop.

use std::convert::Infallible;
use std::sync::Arc;

use axum::response::sse::{Event, Sse};
use futures::stream::{self, Stream};
use parley_agent::Agent;
use parley_core::{AgentResponse, ChatRequest, UserId};
use tokio::sync::mpsc;
use tracing::warn;

/// Frames buffered between the turn and a slow client.
const FRAME_BUFFER: usize = 64;

const ENCODE_FAILURE: &str = r#"{"event":"error","errorMessage":"failed to encode frame"}"#;

pub fn frame_event(frame: &AgentResponse) -> Event {
    match serde_json::to_string(frame) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            warn!(event = frame.event_name(), error = %e, "failed to encode frame");
            Event::default().data(ENCODE_FAILURE)
        }
    }
}

/// Starts a chat turn and streams its frames.
pub fn stream_turn(
    agent: Arc<Agent>,
    user: UserId,
    request: ChatRequest,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    tokio::spawn(async move {
        agent.chat(&user, request, tx).await;
    });

    let frames = stream::unfold(rx, |mut rx| async move {
        let frame = rx.recv().await?;
        Some((Ok(frame_event(&frame)), rx))
    });
    Sse::new(frames)
}

