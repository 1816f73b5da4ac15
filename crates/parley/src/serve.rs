// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` command implementation.
//!
//! Opens the KV store, builds the OpenAI provider and tool registry, and
//! serves the gateway until SIGINT/SIGTERM. Turns still running at shutdown
//! get a grace period to finalize.

use std::sync::Arc;
use std::time::Duration;

use parley_agent::shutdown;
use parley_agent::{Agent, AgentSettings};
use parley_config::model::ParleyConfig;
use parley_core::ParleyError;
use parley_gateway::GatewayState;
use parley_openai::OpenAiProvider;
use parley_skill::ToolRegistry;
use tracing::{error, info, warn};

/// How long in-flight turns may keep running after the listener closes.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.agent.log_level);

    info!(name = %config.agent.name, "starting parley serve");

    let kv = parley_storage::open_store(&config.storage).await?;

    let provider = OpenAiProvider::new(&config).await.map_err(|e| {
        error!(error = %e, "failed to initialize OpenAI provider");
        e
    })?;

    let mut tools = ToolRegistry::new();
    parley_skill::builtin::register_builtins(&mut tools);
    info!("tool registry initialized with {} built-in tools", tools.len());

    if config.gateway.users.is_empty() {
        warn!("no gateway users configured; every API request will be rejected");
    }

    let agent = Arc::new(Agent::new(
        Arc::new(provider),
        kv.clone(),
        Arc::new(tools),
        AgentSettings::from_config(&config),
    )?);
    let state = GatewayState::new(agent.clone(), kv, &config.gateway);

    let cancel = shutdown::install_signal_handler();
    parley_gateway::serve(&config.gateway, state, cancel).await?;

    if !shutdown::drain_turns(&agent, DRAIN_TIMEOUT).await {
        warn!(
            remaining = agent.active_turns(),
            "shutting down with turns still running"
        );
    }

    info!("parley serve shutdown complete");
    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` overrides `agent.log_level`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
