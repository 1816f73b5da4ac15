// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete agent over a [`MockProvider`] and a
//! temp SQLite store. `chat()` drives one full turn and returns every frame
//! the client would have received.

use std::sync::Arc;

use parley_agent::{Agent, AgentSettings};
use parley_config::model::{StorageBackend, StorageConfig};
use parley_core::{AgentResponse, ChatRequest, KvStore, ParleyError, UserId};
use parley_skill::{Tool, ToolRegistry};
use tokio::sync::mpsc;

use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    tools: Vec<Arc<dyn Tool>>,
    builtins: bool,
    settings: AgentSettings,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            tools: Vec::new(),
            builtins: false,
            settings: AgentSettings::default(),
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Registers `dateTime` and `drawChart`.
    pub fn with_builtin_tools(mut self) -> Self {
        self.builtins = true;
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.settings.max_tool_iterations = max;
        self
    }

    pub fn without_web_search(mut self) -> Self {
        self.settings.web_search = false;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, ParleyError> {
        let temp_dir = tempfile::TempDir::new().map_err(ParleyError::storage)?;
        let storage_config = StorageConfig {
            backend: StorageBackend::Sqlite,
            database_path: temp_dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let kv = parley_storage::open_store(&storage_config).await?;

        let mut registry = ToolRegistry::new();
        if self.builtins {
            parley_skill::builtin::register_builtins(&mut registry);
        }
        for tool in self.tools {
            registry.register(tool);
        }

        let provider = Arc::new(MockProvider::new());
        let agent = Arc::new(Agent::new(
            provider.clone(),
            kv.clone(),
            Arc::new(registry),
            self.settings,
        )?);

        Ok(TestHarness {
            provider,
            kv,
            agent,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock provider and temp storage.
pub struct TestHarness {
    /// The scripted provider; queue rounds on it before calling `chat`.
    pub provider: Arc<MockProvider>,
    /// SQLite store (temp DB, cleaned up on drop).
    pub kv: Arc<dyn KvStore>,
    pub agent: Arc<Agent>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Runs one turn with the default model and collects its frames.
    pub async fn chat(&self, user: &str, content: &str) -> Vec<AgentResponse> {
        self.chat_request(
            user,
            ChatRequest {
                model: None,
                content: content.to_string(),
            },
        )
        .await
    }

    pub async fn chat_request(&self, user: &str, request: ChatRequest) -> Vec<AgentResponse> {
        let (tx, mut rx) = mpsc::channel(64);
        let user = UserId::from(user);
        let collect = async move {
            let mut frames = Vec::new();
            while let Some(frame) = rx.recv().await {
                frames.push(frame);
            }
            frames
        };
        let (_, frames) = tokio::join!(self.agent.chat(&user, request, tx), collect);
        frames
    }
}

/// Contents of every `finalize` frame, in order.
pub fn finalized_texts(frames: &[AgentResponse]) -> Vec<String> {
    frames
        .iter()
        .filter_map(|frame| match frame {
            AgentResponse::Finalize { content, .. } => Some(content.clone()),
            _ => None,
        })
        .collect()
}
