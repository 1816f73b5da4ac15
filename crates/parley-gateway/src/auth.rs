// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication middleware for the gateway.
//!
//! A bearer token (`Authorization: Bearer <token>`) maps to a user id from
//! `[[gateway.users]]`. When `allowed_users` is non-empty, resolved users
//! outside it are refused with 403. When no tokens are configured, every
//! request is rejected (fail-closed).

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use parley_config::model::GatewayConfig;
use parley_core::UserId;
use tracing::{debug, warn};

use crate::server::GatewayState;

/// The caller resolved by [`auth_middleware`], available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

/// Token table and allow-list.
#[derive(Clone)]
pub struct AuthConfig {
    tokens: Arc<HashMap<String, UserId>>,
    allowed_users: Arc<HashSet<String>>,
}

impl AuthConfig {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            tokens: Arc::new(
                config
                    .users
                    .iter()
                    .map(|u| (u.token.clone(), UserId::from(u.user_id.as_str())))
                    .collect(),
            ),
            allowed_users: Arc::new(config.allowed_users.iter().cloned().collect()),
        }
    }

    /// Maps a bearer token to its user, applying the allow-list.
    pub fn resolve(&self, token: &str) -> Result<UserId, StatusCode> {
        let user = self.tokens.get(token).ok_or(StatusCode::UNAUTHORIZED)?;
        if !self.allowed_users.is_empty() && !self.allowed_users.contains(user.as_str()) {
            debug!(user_id = %user, "user not in allowed_users");
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(user.clone())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("tokens", &format!("[{} redacted]", self.tokens.len()))
            .field("allowed_users", &self.allowed_users)
            .finish()
    }
}

/// Client address: first `X-Forwarded-For` hop, else the peer address.
fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
}

/// Middleware that resolves the bearer token to an [`AuthUser`].
pub async fn auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if state.auth.tokens.is_empty() {
        tracing::error!("gateway has no users configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let user = state.auth.resolve(token)?;

    let ip = client_ip(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
    );
    if let Err(e) = state.sessions.touch(&user, ip).await {
        warn!(user_id = %user, error = %e, "failed to record session");
    }

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}
