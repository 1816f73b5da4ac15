// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider trait for Responses-style LLM backends.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::ParleyError;
use crate::responses::{ProviderRequest, ProviderResponse, ResponseStreamEvent};
use crate::traits::adapter::PluginAdapter;

/// Ordered stream of decoded provider events for one upstream call.
///
/// Dropping the stream aborts the underlying request.
pub type ResponseEventStream =
    Pin<Box<dyn Stream<Item = Result<ResponseStreamEvent, ParleyError>> + Send>>;

#[async_trait]
pub trait ResponsesProvider: PluginAdapter {
    /// Sends a non-streaming request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError>;

    /// Sends a streaming request.
    async fn stream(&self, request: ProviderRequest) -> Result<ResponseEventStream, ParleyError>;
}
