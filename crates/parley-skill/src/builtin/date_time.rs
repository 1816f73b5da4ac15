// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Current date and time in a caller-chosen IANA time zone.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parley_core::ParleyError;
use serde_json::Value;

use crate::tool::Tool;

/// en-US style, e.g. `03/09/2026, 02:05:07 PM`.
const DATE_TIME_FORMAT: &str = "%m/%d/%Y, %I:%M:%S %p";

pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "dateTime"
    }

    fn description(&self) -> &str {
        "Retrieve current date and time"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "timeZone": {
                    "type": "string",
                    "description": "IANA timezone string"
                }
            },
            "required": ["timeZone"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, input: Value) -> Result<Value, ParleyError> {
        let zone = input["timeZone"]
            .as_str()
            .ok_or_else(|| ParleyError::tool("missing required 'timeZone' parameter"))?;
        let date_time = format_date_time(Utc::now(), zone)?;
        Ok(serde_json::json!({ "dateTime": date_time }))
    }
}

/// Renders `now` in `zone`. Unknown zones are tool errors.
pub fn format_date_time(now: DateTime<Utc>, zone: &str) -> Result<String, ParleyError> {
    let tz: Tz = zone
        .parse()
        .map_err(|_| ParleyError::tool(format!("invalid time zone: {zone}")))?;
    Ok(now.with_timezone(&tz).format(DATE_TIME_FORMAT).to_string())
}
