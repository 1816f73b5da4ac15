// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in tools for the Parley agent.
//!
//! These are always registered and have no side effects beyond reading the
//! system clock.

pub mod date_time;
pub mod draw_chart;

pub use date_time::DateTimeTool;
pub use draw_chart::DrawChartTool;

use crate::ToolRegistry;
use std::sync::Arc;

/// Registers all built-in tools into the given registry.
pub fn register_builtins(registry: &mut ToolRegistry) {
    registry.register(Arc::new(DateTimeTool));
    registry.register(Arc::new(DrawChartTool));
}
