// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client side of the Parley chat protocol.
//!
//! [`Reconciler`] replays the normalized event stream into a local message
//! mirror and tool-status display. [`ChatClient`] drives it against a running
//! gateway over HTTP.

pub mod client;
pub mod reconciler;

pub use client::ChatClient;
pub use reconciler::{ChatStatus, RECOVERY_DELAY, Reconciler, tool_label};
