// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use parley_agent::Agent;
use parley_config::model::GatewayConfig;
use parley_core::{KvStore, ParleyError};
use parley_storage::SessionStore;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub agent: Arc<Agent>,
    /// Backing store, probed by `/health`.
    pub kv: Arc<dyn KvStore>,
    pub sessions: SessionStore,
    pub auth: AuthConfig,
}

impl GatewayState {
    pub fn new(agent: Arc<Agent>, kv: Arc<dyn KvStore>, config: &GatewayConfig) -> Self {
        Self {
            agent,
            sessions: SessionStore::new(kv.clone()),
            kv,
            auth: AuthConfig::from_config(config),
        }
    }
}

/// Builds the application router.
///
/// - GET /health (public)
/// - POST /chat, GET /messages, POST /summarize, POST /stop (bearer auth)
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/chat", post(handlers::post_chat))
        .route("/messages", get(handlers::get_messages))
        .route("/summarize", post(handlers::post_summarize))
        .route("/stop", post(handlers::post_stop))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds to the configured host:port and serves until `shutdown` fires.
///
/// In-flight responses are allowed to complete after shutdown begins.
pub async fn serve(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), ParleyError> {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|e| ParleyError::Gateway {
        message: format!("gateway server error: {e}"),
        source: Some(Box::new(e)),
    })?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
