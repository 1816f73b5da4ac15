// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI Responses API provider for Parley.
//!
//! Implements [`ResponsesProvider`] with streaming SSE and non-streaming
//! completion. Requests without `instructions` receive the configured
//! system prompt.

pub mod client;
pub mod sse;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use parley_config::ParleyConfig;
use parley_core::{
    AdapterType, HealthStatus, ParleyError, PluginAdapter, ProviderRequest, ProviderResponse,
    ResponseEventStream, ResponsesProvider,
};

use crate::client::OpenAiClient;

/// OpenAI provider. API key resolution: `openai.api_key`, then `OPENAI_API_KEY`.
pub struct OpenAiProvider {
    client: OpenAiClient,
    system_prompt: String,
}

impl OpenAiProvider {
    pub async fn new(config: &ParleyConfig) -> Result<Self, ParleyError> {
        let api_key = resolve_api_key(&config.openai.api_key)?;
        let system_prompt = load_system_prompt(
            &config.agent.name,
            &config.agent.system_prompt,
            &config.agent.system_prompt_file,
        )
        .await;
        let client = OpenAiClient::new(
            &api_key,
            &config.openai.base_url,
            Duration::from_secs(config.openai.timeout_secs),
            config.openai.max_retries,
        )?;

        info!(
            base_url = %config.openai.base_url,
            model = %config.openai.default_model,
            "OpenAI provider initialized"
        );
        Ok(Self::with_client(client, system_prompt))
    }

    pub fn with_client(client: OpenAiClient, system_prompt: String) -> Self {
        Self {
            client,
            system_prompt,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn with_instructions(&self, mut request: ProviderRequest) -> ProviderRequest {
        if request.instructions.is_none() {
            request.instructions = Some(self.system_prompt.clone());
        }
        request
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    /// Does not call the API; health checks must not spend tokens.
    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ResponsesProvider for OpenAiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError> {
        self.client
            .create_response(&self.with_instructions(request))
            .await
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ResponseEventStream, ParleyError> {
        self.client
            .stream_response(&self.with_instructions(request))
            .await
    }
}

fn resolve_api_key(config_key: &Option<String>) -> Result<String, ParleyError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            ParleyError::Config(
                "OpenAI API key not found. Set openai.api_key in config or the OPENAI_API_KEY environment variable.".into(),
            )
        })
}

/// Resolves the system prompt: file, then inline, then the default.
pub async fn load_system_prompt(
    agent_name: &str,
    inline_prompt: &Option<String>,
    prompt_file: &Option<String>,
) -> String {
    if let Some(path) = prompt_file {
        match tokio::fs::read_to_string(path).await {
            Ok(content) if !content.trim().is_empty() => {
                info!(path = %path, "loaded system prompt from file");
                return content.trim().to_string();
            }
            Ok(_) => warn!(path = %path, "system prompt file is empty, falling back"),
            Err(e) => warn!(path = %path, error = %e, "failed to read system prompt file, falling back"),
        }
    }

    if let Some(prompt) = inline_prompt
        && !prompt.is_empty()
    {
        return prompt.clone();
    }

    format!("You are {agent_name}, a helpful personal assistant.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{InputItem, InputRole};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn api_key_from_config_wins() {
        assert_eq!(resolve_api_key(&Some("sk-test".into())).unwrap(), "sk-test");
    }

    #[test]
    fn empty_config_key_never_resolves_to_empty() {
        if let Ok(key) = resolve_api_key(&Some(String::new())) {
            assert!(!key.is_empty());
        }
    }

    #[tokio::test]
    async fn default_prompt_names_agent() {
        let prompt = load_system_prompt("parley", &None, &None).await;
        assert_eq!(prompt, "You are parley, a helpful personal assistant.");
    }

    #[tokio::test]
    async fn inline_prompt_overrides_default() {
        let prompt = load_system_prompt("parley", &Some("Be terse.".into()), &None).await;
        assert_eq!(prompt, "Be terse.");
    }

    #[tokio::test]
    async fn file_prompt_overrides_inline() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prompt.md");
        std::fs::write(&file, "  From a file.\n").unwrap();

        let prompt = load_system_prompt(
            "parley",
            &Some("Inline.".into()),
            &Some(file.to_string_lossy().into_owned()),
        )
        .await;
        assert_eq!(prompt, "From a file.");
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_inline() {
        let prompt = load_system_prompt(
            "parley",
            &Some("Fallback.".into()),
            &Some("/nonexistent/prompt.md".into()),
        )
        .await;
        assert_eq!(prompt, "Fallback.");
    }

    #[tokio::test]
    async fn complete_injects_instructions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(body_partial_json(serde_json::json!({"instructions": "Be terse."})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "resp_1", "model": "gpt-4o-mini", "output": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            OpenAiClient::new("k", &server.uri(), Duration::from_secs(5), 0).unwrap();
        let provider = OpenAiProvider::with_client(client, "Be terse.".into());
        let request = ProviderRequest::new(
            "gpt-4o-mini",
            vec![InputItem::Message {
                role: InputRole::User,
                content: "hi".into(),
            }],
        );
        let response = provider.complete(request).await.unwrap();
        assert_eq!(response.id, "resp_1");
        assert_eq!(provider.name(), "openai");
    }
}
