// ABOUTME: Integration tests for background analysis jobs run directly against the service layer
// ABOUTME: Status compare-and-set, failure handling, and completion email bookkeeping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod helpers;

use counsel_review::database::{NewConversation, UserRecord};
use counsel_review::external::{AnalyzeRequest, ApiCredential};
use counsel_review::models::{AnalysisResult, ConversationStatus};
use counsel_review::services::{run_analysis_job, spawn_analysis_job, AnalysisJob, JobOutcome};
use helpers::test_server::{FakeMode, MailMode, TestServer};

async fn pending_conversation(server: &TestServer, owner: &UserRecord) -> AnalysisJob {
    let text = server.long_transcript();
    let record = server
        .resources
        .database
        .create_conversation(NewConversation {
            user_id: &owner.id,
            text: &text,
            target_behavior: None,
            status: ConversationStatus::Pending,
            analysis: &AnalysisResult::empty(),
        })
        .await
        .unwrap();
    AnalysisJob {
        conversation_id: record.id,
        owner_email: owner.email.clone(),
        request: AnalyzeRequest {
            text,
            target_behavior: None,
            api_key: Some(ApiCredential::new("sk-job-key")),
        },
    }
}

async fn stored_status(
    server: &TestServer,
    job: &AnalysisJob,
    owner: &UserRecord,
) -> (ConversationStatus, bool) {
    let record = server
        .resources
        .database
        .get_conversation(&job.conversation_id, &owner.id)
        .await
        .unwrap()
        .unwrap();
    (record.status, record.email_notified)
}

#[tokio::test]
async fn test_job_completes_and_notifies() {
    let server = TestServer::new().await;
    let (owner, _) = server.create_user("owner@example.com").await;
    let job = pending_conversation(&server, &owner).await;

    let outcome = run_analysis_job(&server.resources, job.clone()).await;

    assert_eq!(outcome, JobOutcome::Completed { notified: true });
    assert_eq!(
        stored_status(&server, &job, &owner).await,
        (ConversationStatus::Completed, true)
    );
    let messages = server.mailer.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject, "Conversation analysis complete");
}

#[tokio::test]
async fn test_skipped_email_is_not_recorded_as_notified() {
    let server = TestServer::new().await;
    let (owner, _) = server.create_user("owner@example.com").await;
    server.mailer.set_mode(MailMode::Skip);
    let job = pending_conversation(&server, &owner).await;

    let outcome = run_analysis_job(&server.resources, job.clone()).await;

    assert_eq!(outcome, JobOutcome::Completed { notified: false });
    assert_eq!(
        stored_status(&server, &job, &owner).await,
        (ConversationStatus::Completed, false)
    );
}

#[tokio::test]
async fn test_timeout_marks_failed() {
    let server = TestServer::new().await;
    let (owner, _) = server.create_user("owner@example.com").await;
    server.analysis.set_mode(FakeMode::Timeout);
    let job = pending_conversation(&server, &owner).await;

    let outcome = spawn_analysis_job(std::sync::Arc::clone(&server.resources), job.clone())
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Failed);
    assert_eq!(
        stored_status(&server, &job, &owner).await,
        (ConversationStatus::Failed, false)
    );
    assert!(server.mailer.messages().is_empty());
}

#[tokio::test]
async fn test_job_runs_at_most_once() {
    let server = TestServer::new().await;
    let (owner, _) = server.create_user("owner@example.com").await;
    let job = pending_conversation(&server, &owner).await;

    let first = run_analysis_job(&server.resources, job.clone()).await;
    let second = run_analysis_job(&server.resources, job.clone()).await;

    assert!(matches!(first, JobOutcome::Completed { .. }));
    assert_eq!(second, JobOutcome::Abandoned);
    assert_eq!(server.analysis.analyze_count(), 1);
    assert_eq!(server.mailer.messages().len(), 1);
}

#[tokio::test]
async fn test_deleted_conversation_is_abandoned() {
    let server = TestServer::new().await;
    let (owner, _) = server.create_user("owner@example.com").await;
    let job = pending_conversation(&server, &owner).await;
    assert!(server
        .resources
        .database
        .delete_conversation(&job.conversation_id, &owner.id)
        .await
        .unwrap());

    let outcome = run_analysis_job(&server.resources, job).await;

    assert_eq!(outcome, JobOutcome::Abandoned);
    assert_eq!(server.analysis.analyze_count(), 0);
}

#[tokio::test]
async fn test_terminal_states_never_move() {
    let server = TestServer::new().await;
    let (owner, _) = server.create_user("owner@example.com").await;
    server.analysis.set_mode(FakeMode::Fail);
    let job = pending_conversation(&server, &owner).await;
    assert_eq!(
        run_analysis_job(&server.resources, job.clone()).await,
        JobOutcome::Failed
    );

    let db = &server.resources.database;
    assert!(!db
        .complete_conversation_analysis(&job.conversation_id, &AnalysisResult::empty())
        .await
        .unwrap());
    assert!(db
        .transition_conversation_status(
            &job.conversation_id,
            ConversationStatus::Failed,
            ConversationStatus::Processing,
        )
        .await
        .is_err());
    assert_eq!(
        stored_status(&server, &job, &owner).await,
        (ConversationStatus::Failed, false)
    );
}
