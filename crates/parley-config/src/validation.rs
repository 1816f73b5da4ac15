// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.
//!
//! All violations are collected; validation never stops at the first one.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{ParleyConfig, StorageBackend};

pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("gateway.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if config.agent.max_tool_iterations == 0 {
        errors.push(ConfigError::validation(
            "agent.max_tool_iterations must be at least 1",
        ));
    }

    if config.summarize.retention_hours == 0 {
        errors.push(ConfigError::validation(
            "summarize.retention_hours must be greater than 0",
        ));
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty for the sqlite backend",
        ));
    }

    let mut tokens = HashSet::new();
    for user in &config.gateway.users {
        if !is_qualified_user_id(&user.user_id) {
            errors.push(ConfigError::validation(format!(
                "gateway.users user_id `{}` must have the form `provider:accountId`",
                user.user_id
            )));
        }
        if user.token.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "gateway.users token for `{}` must not be empty",
                user.user_id
            )));
        } else if !tokens.insert(user.token.as_str()) {
            errors.push(ConfigError::validation(format!(
                "gateway.users token for `{}` is already assigned to another user",
                user.user_id
            )));
        }
    }

    for id in &config.gateway.allowed_users {
        if !is_qualified_user_id(id) {
            errors.push(ConfigError::validation(format!(
                "gateway.allowed_users entry `{id}` must have the form `provider:accountId`"
            )));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn is_qualified_user_id(id: &str) -> bool {
    matches!(id.split_once(':'), Some((provider, account)) if !provider.is_empty() && !account.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserToken;

    fn user(token: &str, user_id: &str) -> UserToken {
        UserToken {
            token: token.into(),
            user_id: user_id.into(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ParleyConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_violation() {
        let mut config = ParleyConfig::default();
        config.gateway.host = "bad host!".into();
        config.agent.max_tool_iterations = 0;
        config.summarize.retention_hours = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rejects_unqualified_user_ids() {
        let mut config = ParleyConfig::default();
        config.gateway.users = vec![user("t1", "alice")];
        config.gateway.allowed_users = vec!["github:".into()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn rejects_duplicate_tokens() {
        let mut config = ParleyConfig::default();
        config.gateway.users = vec![user("same", "github:1"), user("same", "github:2")];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("already assigned"));
    }

    #[test]
    fn memory_backend_ignores_database_path() {
        let mut config = ParleyConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.storage.database_path = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn ipv6_host_is_valid() {
        let mut config = ParleyConfig::default();
        config.gateway.host = "::1".into();
        assert!(validate_config(&config).is_ok());
    }
}
