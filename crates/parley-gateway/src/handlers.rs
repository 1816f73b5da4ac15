// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Handles POST /chat, GET /messages, POST /summarize, POST /stop and the
//! public GET /health.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_core::{ChatRequest, HealthStatus, ParleyError, PluginAdapter};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::auth::AuthUser;
use crate::server::GatewayState;
use crate::sse;

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Response body for POST /stop.
#[derive(Debug, Serialize, Deserialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Upstream failures are 502; everything else is ours.
fn failure_status(e: &ParleyError) -> StatusCode {
    match e {
        ParleyError::Provider { .. } | ParleyError::Timeout { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /chat
///
/// Streams one turn as `text/event-stream`. The stream always ends with an
/// `end` frame; failures inside the turn arrive as `error` frames.
pub async fn post_chat(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> Response {
    if body.content.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "content must not be empty");
    }
    sse::stream_turn(state.agent.clone(), user, body).into_response()
}

/// GET /messages
pub async fn get_messages(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Response {
    match state.agent.messages(&user).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => {
            error!(user_id = %user, error = %e, "failed to load messages");
            error_response(failure_status(&e), e.to_string())
        }
    }
}

/// POST /summarize
///
/// Returns the topic groups produced, `[]` when nothing has aged out.
pub async fn post_summarize(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Response {
    match state.agent.summarize(&user).await {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => {
            warn!(user_id = %user, error = %e, "summarization failed");
            error_response(failure_status(&e), e.to_string())
        }
    }
}

/// POST /stop
pub async fn post_stop(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Json<StopResponse> {
    Json(StopResponse {
        stopped: state.agent.stop(&user),
    })
}

/// GET /health
///
/// Unauthenticated. Reflects the KV store's health check.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let (code, status) = match state.kv.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "healthy"),
        Ok(HealthStatus::Degraded(reason)) => {
            warn!(reason = %reason, "storage degraded");
            (StatusCode::OK, "degraded")
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(reason = %reason, "storage unhealthy");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
        Err(e) => {
            warn!(error = %e, "storage health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
        .into_response()
}
