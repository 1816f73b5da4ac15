// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] the server watches. In-flight turns are given a
//! grace period to reach `end` before the process exits.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Agent;

const DRAIN_POLL: Duration = Duration::from_millis(100);

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits up to `timeout` for running turns to finish.
///
/// Returns `true` when every turn finished in time.
pub async fn drain_turns(agent: &Agent, timeout: Duration) -> bool {
    let active = agent.active_turns();
    if active == 0 {
        info!("no active turns to drain");
        return true;
    }
    info!(count = active, "waiting for active turns to complete");

    let deadline = tokio::time::Instant::now() + timeout;
    while agent.active_turns() > 0 {
        if tokio::time::Instant::now() >= deadline {
            warn!(
                remaining = agent.active_turns(),
                "timeout reached, some turns interrupted"
            );
            return false;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
    info!("all turns drained");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentSettings;
    use parley_core::UserId;
    use parley_skill::ToolRegistry;
    use parley_storage::MemoryKvStore;
    use parley_test_utils::MockProvider;
    use std::sync::Arc;

    fn agent() -> Agent {
        Agent::new(
            Arc::new(MockProvider::new()),
            Arc::new(MemoryKvStore::new()),
            Arc::new(ToolRegistry::new()),
            AgentSettings::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn drain_without_turns_is_immediate() {
        assert!(drain_turns(&agent(), Duration::from_millis(10)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_times_out_on_stuck_turn() {
        let agent = agent();
        let _token = agent.active.register(&UserId::from("alice"));
        assert!(!drain_turns(&agent, Duration::from_millis(250)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_finishing_turn() {
        let agent = Arc::new(agent());
        let user = UserId::from("alice");
        let _token = agent.active.register(&user);

        let finisher = {
            let agent = agent.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                agent.active.finish(&user);
            })
        };
        assert!(drain_turns(&agent, Duration::from_secs(5)).await);
        finisher.await.unwrap();
    }
}
