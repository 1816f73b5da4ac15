// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - a streaming chat agent over the OpenAI Responses API.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod ask;
mod config_cmd;
mod serve;

use clap::{Parser, Subcommand};

/// Parley - a streaming chat agent.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for commands that talk to a running gateway.
#[derive(clap::Args, Debug, Clone)]
struct RemoteArgs {
    /// Gateway base URL. Defaults to the configured host and port.
    #[arg(long)]
    url: Option<String>,

    /// Bearer token. Falls back to the PARLEY_TOKEN environment variable.
    #[arg(long)]
    token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Send one message and stream the reply.
    Ask {
        /// Message content.
        content: String,

        /// Model override for this turn.
        #[arg(long)]
        model: Option<String>,

        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Print the durable conversation history as JSON.
    History {
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Validate and print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match parley_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Ask {
            content,
            model,
            remote,
        }) => ask::run_ask(&config, &remote, &content, model).await,
        Some(Commands::History { remote }) => ask::run_history(&config, &remote).await,
        Some(Commands::Config) => config_cmd::run_config(&config),
        None => {
            println!("parley: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
