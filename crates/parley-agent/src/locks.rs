// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user turn serialization and in-flight turn tracking.

use std::sync::Arc;

use dashmap::DashMap;
use parley_core::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

/// One async mutex per user. Chat turns and summarization for the same
/// user run one at a time; different users never contend.
#[derive(Default)]
pub struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the user's lock. The guard releases it on drop.
    pub async fn acquire(&self, user: &UserId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

/// Cancellation handles of turns currently running, keyed by user.
#[derive(Default)]
pub struct ActiveTurns {
    turns: DashMap<UserId, CancellationToken>,
}

impl ActiveTurns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh token for the user's turn.
    pub fn register(&self, user: &UserId) -> CancellationToken {
        let token = CancellationToken::new();
        self.turns.insert(user.clone(), token.clone());
        token
    }

    /// Cancels the user's running turn. Returns false when none is running.
    pub fn cancel(&self, user: &UserId) -> bool {
        match self.turns.get(user) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn finish(&self, user: &UserId) {
        self.turns.remove(user);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_waits() {
        let locks = Arc::new(UserLocks::new());
        let user = UserId::from("github:1");
        let guard = locks.acquire(&user).await;

        let waiter = {
            let locks = locks.clone();
            let user = user.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&user).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn different_users_do_not_contend() {
        let locks = UserLocks::new();
        let _a = locks.acquire(&UserId::from("github:1")).await;
        let _b = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire(&UserId::from("github:2")),
        )
        .await
        .expect("second user should not block");
    }

    #[test]
    fn cancel_reaches_registered_turn() {
        let turns = ActiveTurns::new();
        let user = UserId::from("github:1");
        assert!(!turns.cancel(&user));

        let token = turns.register(&user);
        assert_eq!(turns.len(), 1);
        assert!(turns.cancel(&user));
        assert!(token.is_cancelled());

        turns.finish(&user);
        assert!(turns.is_empty());
    }
}
