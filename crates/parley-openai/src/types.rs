// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI error envelope. Request and event types live in `parley_core::responses`.

use serde::Deserialize;

/// Body of a non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

impl ApiErrorDetail {
    /// Most specific classifier available: `code`, else `type`.
    pub fn kind(&self) -> &str {
        self.code
            .as_deref()
            .or(self.type_.as_deref())
            .unwrap_or("unknown_error")
    }
}
