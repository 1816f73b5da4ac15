// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound frame channel for one turn.

use parley_core::AgentResponse;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Sends protocol frames to the client.
///
/// When the receiving side goes away the turn's cancellation token is
/// triggered, which stops the tool loop and aborts the upstream call.
/// Later frames are dropped silently.
pub struct Emitter {
    tx: mpsc::Sender<AgentResponse>,
    cancel: CancellationToken,
    closed: bool,
}

impl Emitter {
    pub fn new(tx: mpsc::Sender<AgentResponse>, cancel: CancellationToken) -> Self {
        Self {
            tx,
            cancel,
            closed: false,
        }
    }

    pub async fn emit(&mut self, frame: AgentResponse) {
        if self.closed {
            return;
        }
        if self.tx.send(frame).await.is_err() {
            debug!("client stream closed, stopping turn");
            self.closed = true;
            self.cancel.cancel();
        }
    }

    pub async fn emit_all(&mut self, frames: impl IntoIterator<Item = AgentResponse>) {
        for frame in frames {
            self.emit(frame).await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Resolves once the client has gone away, even while nothing is being sent.
    pub async fn client_gone(&self) {
        self.tx.closed().await;
    }
}
