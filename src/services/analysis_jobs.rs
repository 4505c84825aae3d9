// ABOUTME: Background analysis of long transcripts and the completion email
// ABOUTME: At-most-once, untracked jobs coordinated only through the persisted conversation status
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! # Background Analysis Jobs
//!
//! A job claims its conversation (`pending -> processing`), calls the Analysis
//! Service, then stores the result (`processing -> completed`) or gives up
//! (`processing -> failed`). There is no retry and no job registry: if the
//! process stops mid-job the conversation stays `processing`. Clients observe
//! progress by re-reading the conversation.
//!
//! After a successful completion the owner is emailed a link to the analysis.
//! Delivery problems are logged and leave the status untouched;
//! `email_notified` is only set once the relay accepted the message.

use crate::external::AnalyzeRequest;
use crate::logging::AppLogger;
use crate::notifications::{render_analysis_complete_email, Delivery};
use crate::resources::ServerResources;
use counsel_core::models::ConversationStatus;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Work item for one long transcript
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    /// Conversation to analyse (must be `pending`)
    pub conversation_id: String,
    /// Where the completion email goes
    pub owner_email: String,
    /// Request forwarded to the Analysis Service
    pub request: AnalyzeRequest,
}

/// How a job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Analysis stored; `notified` tells whether the email went out
    Completed {
        /// Completion email accepted by the relay
        notified: bool,
    },
    /// Analysis failed and the conversation is `failed`
    Failed,
    /// The conversation was not in the expected state (deleted or claimed elsewhere)
    Abandoned,
}

/// Start `job` on the runtime and return immediately
///
/// Nothing awaits the returned handle in production; tests use it to wait for
/// completion deterministically.
pub fn spawn_analysis_job(resources: Arc<ServerResources>, job: AnalysisJob) -> JoinHandle<JobOutcome> {
    tokio::spawn(async move { run_analysis_job(&resources, job).await })
}

/// Run one job to completion
pub async fn run_analysis_job(resources: &ServerResources, job: AnalysisJob) -> JobOutcome {
    let id = job.conversation_id.as_str();
    let db = &resources.database;

    match db
        .transition_conversation_status(id, ConversationStatus::Pending, ConversationStatus::Processing)
        .await
    {
        Ok(true) => AppLogger::log_analysis_event(id, ConversationStatus::Processing.as_str(), None),
        Ok(false) => {
            warn!(conversation.id = %id, "Conversation no longer pending; skipping analysis");
            return JobOutcome::Abandoned;
        }
        Err(e) => {
            error!(conversation.id = %id, error = %e, "Failed to claim conversation for analysis");
            return JobOutcome::Abandoned;
        }
    }

    let started = Instant::now();
    let analysis = match resources.analysis_service.analyze(&job.request).await {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(conversation.id = %id, error.code = ?e.code, error = %e, "Background analysis failed");
            mark_failed(resources, id).await;
            return JobOutcome::Failed;
        }
    };
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match db.complete_conversation_analysis(id, &analysis).await {
        Ok(true) => AppLogger::log_analysis_event(
            id,
            ConversationStatus::Completed.as_str(),
            Some(elapsed_ms),
        ),
        Ok(false) => {
            warn!(conversation.id = %id, "Conversation left processing before analysis was stored");
            return JobOutcome::Abandoned;
        }
        Err(e) => {
            error!(conversation.id = %id, error = %e, "Failed to store analysis");
            mark_failed(resources, id).await;
            return JobOutcome::Failed;
        }
    }

    let notified = notify_owner(resources, &job).await;
    JobOutcome::Completed { notified }
}

async fn mark_failed(resources: &ServerResources, conversation_id: &str) {
    match resources
        .database
        .transition_conversation_status(
            conversation_id,
            ConversationStatus::Processing,
            ConversationStatus::Failed,
        )
        .await
    {
        Ok(_) => AppLogger::log_analysis_event(conversation_id, ConversationStatus::Failed.as_str(), None),
        Err(e) => error!(conversation.id = %conversation_id, error = %e, "Failed to mark conversation failed"),
    }
}

async fn notify_owner(resources: &ServerResources, job: &AnalysisJob) -> bool {
    let id = job.conversation_id.as_str();
    let link = resources.config.email.analysis_link(id);
    let message = render_analysis_complete_email(&job.owner_email, &link);

    match resources.mailer.send(message).await {
        Ok(Delivery::Sent) => {
            if let Err(e) = resources.database.mark_email_notified(id).await {
                error!(conversation.id = %id, error = %e, "Email sent but flag not stored");
                return false;
            }
            info!(conversation.id = %id, "Analysis completion email sent");
            true
        }
        Ok(Delivery::Skipped) => false,
        Err(e) => {
            warn!(conversation.id = %id, error = %e, "Failed to send analysis completion email");
            false
        }
    }
}
