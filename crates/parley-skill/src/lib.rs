// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait, registry, and built-in tools for the Parley chat agent.
//!
//! The [`ToolRegistry`] validates model-supplied arguments against each
//! tool's JSON Schema before dispatch and produces Responses-format function
//! definitions for the provider request.
//!
//! Built-in tools:
//! - [`builtin::DateTimeTool`] -- current date and time in an IANA zone
//! - [`builtin::DrawChartTool`] -- SVG line chart from a data series

pub mod builtin;
pub mod tool;

pub use tool::{Tool, ToolRegistry};
