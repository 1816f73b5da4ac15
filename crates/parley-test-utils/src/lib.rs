// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted Responses provider, one queued round per upstream call
//! - [`TestHarness`] - Agent over a temp SQLite store, driven turn by turn
//! - [`FailingTool`] / [`EchoTool`] - Tools with fixed behaviour

pub mod harness;
pub mod mock_provider;
pub mod tools;

pub use harness::{TestHarness, TestHarnessBuilder, finalized_texts};
pub use mock_provider::{
    MockProvider, MockRound, function_call_round, text_round, web_search_round,
};
pub use tools::{EchoTool, FailingTool};
