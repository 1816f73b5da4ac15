// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage metering for the Parley chat agent.
//!
//! Counts tokens with the cl100k_base encoding and appends one metering
//! record per turn to the user's log.

pub mod ledger;
pub mod tokenizer;

pub use ledger::{Metering, MeteringLedger, MeteringRecord};
pub use tokenizer::TokenCounter;
