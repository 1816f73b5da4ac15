// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley ask` and `parley history`: thin clients for a running gateway.

use std::io::Write;

use parley_client::{ChatClient, Reconciler};
use parley_config::model::ParleyConfig;
use parley_core::{AgentResponse, ParleyError};

use crate::RemoteArgs;

const TOKEN_ENV: &str = "PARLEY_TOKEN";

/// Resolves the gateway URL: `--url`, then the configured host and port.
fn gateway_url(config: &ParleyConfig, remote: &RemoteArgs) -> String {
    remote
        .url
        .clone()
        .unwrap_or_else(|| format!("http://{}:{}", config.gateway.host, config.gateway.port))
}

fn resolve_token(remote: &RemoteArgs, env_token: Option<String>) -> Result<String, ParleyError> {
    remote
        .token
        .clone()
        .or(env_token)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            ParleyError::Config(format!(
                "no gateway token. Pass --token or set {TOKEN_ENV}."
            ))
        })
}

fn connect(config: &ParleyConfig, remote: &RemoteArgs) -> Result<ChatClient, ParleyError> {
    let token = resolve_token(remote, std::env::var(TOKEN_ENV).ok())?;
    ChatClient::new(&gateway_url(config, remote), &token)
}

/// Tracks what has already been printed for one streamed turn.
#[derive(Default)]
struct TurnPrinter {
    labels: Vec<String>,
    streamed: bool,
}

impl TurnPrinter {
    fn on_frame(&mut self, reconciler: &Reconciler, frame: &AgentResponse) {
        match frame {
            AgentResponse::Delta { content, .. } => {
                print!("{content}");
                let _ = std::io::stdout().flush();
                self.streamed = true;
            }
            AgentResponse::Finalize { content, .. } if !self.streamed => {
                // A finalize without deltas is a synthesized fallback.
                println!("{content}");
            }
            AgentResponse::Finalize { .. } => {
                println!();
                self.streamed = false;
            }
            _ => {}
        }

        let labels = reconciler.tool_labels();
        if labels != self.labels {
            for label in labels.iter().filter(|l| !self.labels.contains(l)) {
                eprintln!("[{label}]");
            }
            self.labels = labels;
        }
    }
}

pub async fn run_ask(
    config: &ParleyConfig,
    remote: &RemoteArgs,
    content: &str,
    model: Option<String>,
) -> Result<(), ParleyError> {
    let client = connect(config, remote)?;
    let mut reconciler = Reconciler::new();
    let loaded = client.load(&mut reconciler).await;
    print_notices(&mut reconciler);
    loaded?;

    let mut printer = TurnPrinter::default();
    let result = client
        .chat(&mut reconciler, content, model, |r, frame| {
            printer.on_frame(r, frame)
        })
        .await;
    print_notices(&mut reconciler);
    result
}

pub async fn run_history(config: &ParleyConfig, remote: &RemoteArgs) -> Result<(), ParleyError> {
    let client = connect(config, remote)?;
    let messages = client.messages().await?;
    let json = serde_json::to_string_pretty(&messages)
        .map_err(|e| ParleyError::Internal(format!("failed to encode history: {e}")))?;
    println!("{json}");
    Ok(())
}

fn print_notices(reconciler: &mut Reconciler) {
    for notice in reconciler.take_notices() {
        eprintln!("warning: {notice}");
    }
}
