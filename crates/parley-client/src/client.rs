// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP driver for a Parley gateway.
//!
//! [`ChatClient`] speaks the gateway's JSON endpoints and pumps the chat SSE
//! body into a [`Reconciler`] chunk by chunk.

use std::time::Duration;

use futures::StreamExt;
use parley_core::{AgentResponse, ChatRequest, Message, ParleyError};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::reconciler::{RECOVERY_DELAY, Reconciler};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct StopBody {
    stopped: bool,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    recovery_delay: Duration,
}

impl ChatClient {
    /// `base_url` is the gateway root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ParleyError> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ParleyError::Config(format!("invalid token header value: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        // No overall timeout: a chat body stays open for the whole turn.
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| gateway_error("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            recovery_delay: RECOVERY_DELAY,
        })
    }

    pub fn with_recovery_delay(mut self, delay: Duration) -> Self {
        self.recovery_delay = delay;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fetches the durable history.
    pub async fn messages(&self) -> Result<Vec<Message>, ParleyError> {
        let response = self
            .client
            .get(self.url("/messages"))
            .send()
            .await
            .map_err(|e| gateway_error("GET /messages failed", e))?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| gateway_error("failed to decode messages", e))
    }

    /// Asks the server to fold aged-out history into memory items.
    pub async fn summarize(&self) -> Result<Vec<serde_json::Value>, ParleyError> {
        let response = self
            .client
            .post(self.url("/summarize"))
            .send()
            .await
            .map_err(|e| gateway_error("POST /summarize failed", e))?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| gateway_error("failed to decode summary", e))
    }

    /// Requests that the user's running turn stop. `false` when none was running.
    pub async fn stop(&self) -> Result<bool, ParleyError> {
        let response = self
            .client
            .post(self.url("/stop"))
            .send()
            .await
            .map_err(|e| gateway_error("POST /stop failed", e))?;
        let response = check_status(response).await?;
        let body: StopBody = response
            .json()
            .await
            .map_err(|e| gateway_error("failed to decode stop response", e))?;
        Ok(body.stopped)
    }

    /// Loads history into the reconciler, raising a notice on failure.
    pub async fn load(&self, reconciler: &mut Reconciler) -> Result<(), ParleyError> {
        reconciler.begin_loading();
        match self.messages().await {
            Ok(messages) => {
                reconciler.load(messages);
                Ok(())
            }
            Err(e) => {
                reconciler.load_failed(&e);
                Err(e)
            }
        }
    }

    /// Runs one chat turn, calling `on_frame` after each frame is applied.
    ///
    /// On a transport failure the reconciler is given a notice and, after the
    /// recovery delay, committed as-is; the error is then returned.
    pub async fn chat<F>(
        &self,
        reconciler: &mut Reconciler,
        content: &str,
        model: Option<String>,
        mut on_frame: F,
    ) -> Result<(), ParleyError>
    where
        F: FnMut(&Reconciler, &AgentResponse),
    {
        let request = reconciler.send(content, model)?;

        match self.pump(reconciler, &request, &mut on_frame).await {
            Ok(()) => {
                reconciler.finish();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "chat stream failed");
                reconciler.fail(&e);
                tokio::time::sleep(self.recovery_delay).await;
                reconciler.recover();
                Err(e)
            }
        }
    }

    async fn pump<F>(
        &self,
        reconciler: &mut Reconciler,
        request: &ChatRequest,
        on_frame: &mut F,
    ) -> Result<(), ParleyError>
    where
        F: FnMut(&Reconciler, &AgentResponse),
    {
        let response = self
            .client
            .post(self.url("/chat"))
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(request)
            .send()
            .await
            .map_err(|e| gateway_error("POST /chat failed", e))?;
        let response = check_status(response).await?;

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| gateway_error("chat stream interrupted", e))?;
            debug!(bytes = chunk.len(), "chat chunk");
            for frame in reconciler.feed(&chunk) {
                on_frame(reconciler, &frame);
            }
        }
        Ok(())
    }
}

fn gateway_error(context: &str, e: reqwest::Error) -> ParleyError {
    ParleyError::Gateway {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Turns a non-success response into an error carrying the server's message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ParleyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => format!("gateway returned {status}: {}", err.error),
        Err(_) if body.is_empty() => format!("gateway returned {status}"),
        Err(_) => format!("gateway returned {status}: {body}"),
    };
    Err(ParleyError::Gateway {
        message,
        source: None,
    })
}
