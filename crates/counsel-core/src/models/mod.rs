// ABOUTME: Domain model module for evaluation axes, analysis payloads and job status
// ABOUTME: Re-exports the typed shapes exchanged with the Analysis Service and stored per conversation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

mod analysis;
mod axis;
mod status;

pub use analysis::{AnalysisResult, AnalysisStatement, StatementIcon};
pub use axis::EvaluationAxis;
pub use status::ConversationStatus;

use thiserror::Error;

/// Failure to parse a domain value from its wire or storage representation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Not one of `cct`, `sst`, `empathy`, `partnership`
    #[error("unknown evaluation axis: {0}")]
    UnknownAxis(String),
    /// Not one of `pending`, `processing`, `completed`, `failed`
    #[error("unknown conversation status: {0}")]
    UnknownStatus(String),
}
