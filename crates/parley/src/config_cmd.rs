// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley config`: prints the effective configuration as TOML.
//!
//! Reaching this point means the configuration already validated. Secrets
//! are masked before printing.

use parley_config::model::ParleyConfig;
use parley_core::ParleyError;

const MASK: &str = "********";

fn redacted(config: &ParleyConfig) -> ParleyConfig {
    let mut config = config.clone();
    if config.openai.api_key.is_some() {
        config.openai.api_key = Some(MASK.to_string());
    }
    for user in &mut config.gateway.users {
        user.token = MASK.to_string();
    }
    config
}

pub fn render_config(config: &ParleyConfig) -> Result<String, ParleyError> {
    toml::to_string_pretty(&redacted(config))
        .map_err(|e| ParleyError::Config(format!("failed to render config: {e}")))
}

pub fn run_config(config: &ParleyConfig) -> Result<(), ParleyError> {
    println!("# configuration is valid");
    print!("{}", render_config(config)?);
    Ok(())
}
