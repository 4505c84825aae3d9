// ABOUTME: Domain services between the HTTP routes and storage
// ABOUTME: Conversation workflows, background analysis, credentials, and statement reconciliation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

/// Background analysis of long transcripts
pub mod analysis_jobs;
/// AI credential resolution and masking
pub mod credentials;
/// Submission and follow-up chat workflows
pub mod conversations;
/// Mapping evaluations back onto transcript lines
pub mod reconciliation;

pub use analysis_jobs::{run_analysis_job, spawn_analysis_job, AnalysisJob, JobOutcome};
pub use conversations::{ConversationService, FollowUpQuestion, NewSubmission, Submission};
pub use credentials::{api_key_preview, resolve_credential};
pub use reconciliation::{reconcile, transcript_lines, ReconciledStatement};
