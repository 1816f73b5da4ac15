// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits. Every backend extends [`PluginAdapter`] and uses
//! `#[async_trait]` so it can sit behind `Arc<dyn ...>`.

pub mod adapter;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use provider::{ResponseEventStream, ResponsesProvider};
pub use storage::KvStore;
