// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Parley chat agent.
//!
//! Exposes the turn pipeline over axum: chat turns stream as Server-Sent
//! Events in the normalized protocol, and the durable history, summarizer
//! and stop control are plain JSON endpoints. Every route except `/health`
//! requires a bearer token that maps to a user id.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod sse;

pub use auth::{AuthConfig, AuthUser};
pub use server::{GatewayState, build_router, serve};
