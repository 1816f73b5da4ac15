// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! cl100k_base token counting.

use tiktoken_rs::CoreBPE;

use parley_core::{Message, ParleyError, TokenUsage};

/// Deterministic subword tokenizer matching the provider's encoding.
///
/// Building the BPE tables is expensive; construct once and share.
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    pub fn cl100k() -> Result<Self, ParleyError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ParleyError::Internal(format!("failed to load cl100k_base: {e}")))?;
        Ok(Self { bpe })
    }

    pub fn count(&self, text: &str) -> u64 {
        self.bpe.encode_ordinary(text).len() as u64
    }

    /// Sum of token counts over message contents.
    pub fn count_messages(&self, messages: &[Message]) -> u64 {
        messages.iter().map(|m| self.count(&m.content)).sum()
    }

    /// `input` counts the prior history, `output` the turn's new messages.
    pub fn usage(&self, prior: &[Message], output: &[Message]) -> TokenUsage {
        TokenUsage::new(self.count_messages(prior), self.count_messages(output))
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").field("encoding", &"cl100k_base").finish()
    }
}
