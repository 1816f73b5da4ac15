// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry for model-invocable functions.
//!
//! The [`Tool`] trait is the interface every built-in function implements.
//! The [`ToolRegistry`] owns tool lookup by name, validates arguments
//! against the tool's JSON Schema, and generates Responses-format function
//! definitions for the provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parley_core::ParleyError;
use serde_json::Value;
use tracing::debug;

/// A named, schema-described function the model may call.
///
/// `invoke` receives arguments that have already passed schema validation
/// and returns any JSON-serializable result, or a [`ParleyError::Tool`]
/// carrying a human-readable message.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, used for dispatch and in the provider definition.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the argument object.
    fn parameters_schema(&self) -> Value;

    async fn invoke(&self, input: Value) -> Result<Value, ParleyError>;
}

/// Registry of available tools, indexed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool under its `name()`, replacing any previous entry.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Returns (name, description) pairs sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Returns Responses-format function definitions, sorted by name.
    ///
    /// ```json
    /// {
    ///   "type": "function",
    ///   "name": "dateTime",
    ///   "description": "...",
    ///   "parameters": { ... JSON Schema ... },
    ///   "strict": true
    /// }
    /// ```
    pub fn tool_definitions(&self) -> Vec<Value> {
        let mut tools: Vec<&Arc<dyn Tool>> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
            .into_iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "name": t.name(),
                    "description": t.description(),
                    "parameters": t.parameters_schema(),
                    "strict": true,
                })
            })
            .collect()
    }

    /// Parses `arguments` as JSON, validates it against the tool's schema,
    /// and runs the tool.
    ///
    /// Unknown names, malformed JSON, and schema violations are all
    /// reported as [`ParleyError::Tool`] so the caller can feed the message
    /// back to the model.
    pub async fn invoke(&self, name: &str, arguments: &str) -> Result<Value, ParleyError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ParleyError::tool(format!("unknown tool: {name}")))?;

        let input: Value = serde_json::from_str(arguments).map_err(|e| ParleyError::Tool {
            message: format!("invalid arguments for {name}: {e}"),
            source: Some(Box::new(e)),
        })?;

        validate_arguments(name, &tool.parameters_schema(), &input)?;

        debug!(tool = %name, "invoking tool");
        tool.invoke(input).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_arguments(name: &str, schema: &Value, input: &Value) -> Result<(), ParleyError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| ParleyError::tool(format!("invalid schema for {name}: {e}")))?;

    let problems: Vec<String> = validator
        .iter_errors(input)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{path}: {e}")
            }
        })
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ParleyError::tool(format!(
            "invalid arguments for {name}: {}",
            problems.join("; ")
        )))
    }
}
