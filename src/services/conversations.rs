// ABOUTME: Conversation submission and follow-up chat orchestration
// ABOUTME: Credential resolution, sync/async analysis split, and Analysis Service chat calls
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use super::analysis_jobs::{spawn_analysis_job, AnalysisJob};
use super::credentials::resolve_credential;
use crate::constants::defaults::EMPTY_CHAT_RESPONSE_FALLBACK;
use crate::database::{ChatRecord, ConversationRecord, NewChat, NewConversation, UserRecord};
use crate::external::{AnalyzeRequest, ApiCredential, ChatTurn, DetailedChatRequest};
use crate::middleware::AuthenticatedUser;
use crate::resources::ServerResources;
use counsel_core::errors::{AppError, AppResult};
use counsel_core::models::{AnalysisResult, ConversationStatus, EvaluationAxis};
use std::sync::Arc;
use tracing::info;

/// A validated transcript submission
#[derive(Debug, Clone)]
pub struct NewSubmission {
    /// Transcript text
    pub text: String,
    /// Optional goal
    pub target_behavior: Option<String>,
}

/// Result of submitting a transcript
#[derive(Debug, Clone)]
pub enum Submission {
    /// Short transcript, analysed before responding
    Analyzed(ConversationRecord),
    /// Long transcript, stored as `pending` and analysed in the background
    Queued(ConversationRecord),
}

/// A validated follow-up question
#[derive(Debug, Clone)]
pub struct FollowUpQuestion {
    /// Axis the question is about
    pub aspect: EvaluationAxis,
    /// Question text
    pub question: String,
    /// Transcript line index
    pub statement_index: u32,
    /// Text of that line as shown to the user
    pub statement_content: String,
    /// Whether reference material should be used
    pub use_reference: bool,
}

/// Conversation workflows on behalf of an authenticated user
pub struct ConversationService {
    resources: Arc<ServerResources>,
}

impl ConversationService {
    /// Create a service over shared resources
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    async fn load_user(&self, user: &AuthenticatedUser) -> AppResult<UserRecord> {
        self.resources
            .database
            .get_user(&user.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    fn credential_for(&self, owner: &UserRecord) -> AppResult<ApiCredential> {
        resolve_credential(
            owner.api_key.as_deref(),
            self.resources.config.analysis.default_api_key.as_deref(),
        )
    }

    /// Whether `text` takes the background path
    #[must_use]
    pub fn is_long_text(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.resources.config.limits.long_text_threshold
    }

    /// Store and analyse a transcript
    ///
    /// The credential is resolved before anything is stored, so a missing
    /// credential leaves no row behind. On the synchronous path an Analysis
    /// Service failure is returned and nothing is stored either.
    pub async fn submit(
        &self,
        user: &AuthenticatedUser,
        submission: NewSubmission,
    ) -> AppResult<Submission> {
        let owner = self.load_user(user).await?;
        let credential = self.credential_for(&owner)?;
        let request = AnalyzeRequest {
            text: submission.text,
            target_behavior: submission.target_behavior,
            api_key: Some(credential),
        };

        if self.is_long_text(&request.text) {
            let record = self
                .resources
                .database
                .create_conversation(NewConversation {
                    user_id: &owner.id,
                    text: &request.text,
                    target_behavior: request.target_behavior.as_deref(),
                    status: ConversationStatus::Pending,
                    analysis: &AnalysisResult::empty(),
                })
                .await?;

            info!(conversation.id = %record.id, user.id = %owner.id, "Queued background analysis");
            // Detached; nothing awaits the handle
            drop(spawn_analysis_job(
                Arc::clone(&self.resources),
                AnalysisJob {
                    conversation_id: record.id.clone(),
                    owner_email: owner.email,
                    request,
                },
            ));
            return Ok(Submission::Queued(record));
        }

        let analysis = self.resources.analysis_service.analyze(&request).await?;
        let record = self
            .resources
            .database
            .create_conversation(NewConversation {
                user_id: &owner.id,
                text: &request.text,
                target_behavior: request.target_behavior.as_deref(),
                status: ConversationStatus::Completed,
                analysis: &analysis,
            })
            .await?;

        info!(conversation.id = %record.id, user.id = %owner.id, "Conversation analysed");
        Ok(Submission::Analyzed(record))
    }

    /// A conversation owned by `user`, or `ResourceNotFound`
    pub async fn get_owned(
        &self,
        user: &AuthenticatedUser,
        conversation_id: &str,
    ) -> AppResult<ConversationRecord> {
        self.resources
            .database
            .get_conversation(conversation_id, &user.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))
    }

    /// Ask a follow-up question about one statement and store the answer
    pub async fn ask(
        &self,
        user: &AuthenticatedUser,
        conversation_id: &str,
        question: FollowUpQuestion,
    ) -> AppResult<ChatRecord> {
        let conversation = self.get_owned(user, conversation_id).await?;
        let owner = self.load_user(user).await?;
        let credential = self.credential_for(&owner)?;

        let history = self
            .resources
            .database
            .statement_chat_history(
                &conversation.id,
                question.aspect,
                question.statement_index,
                self.resources.config.limits.max_chat_history,
            )
            .await?;

        let request = DetailedChatRequest {
            conversation_text: conversation.text,
            analysis_result: conversation.analysis,
            aspect: question.aspect,
            user_question: question.question,
            chat_history: ChatTurn::flatten(
                history
                    .iter()
                    .map(|c| (c.user_question.as_str(), c.ai_response.as_str())),
            ),
            use_reference: question.use_reference,
            api_key: Some(credential),
            statement_index: Some(question.statement_index),
            statement_content: Some(question.statement_content),
        };

        let answer = self.resources.analysis_service.detailed_chat(&request).await?;
        let answer = if answer.trim().is_empty() {
            EMPTY_CHAT_RESPONSE_FALLBACK.to_owned()
        } else {
            answer
        };

        let chat = self
            .resources
            .database
            .create_chat(NewChat {
                conversation_id: &conversation.id,
                aspect: question.aspect,
                statement_index: question.statement_index,
                user_question: &request.user_question,
                ai_response: &answer,
                use_reference: question.use_reference,
            })
            .await?;

        info!(
            conversation.id = %conversation.id,
            chat.aspect = %question.aspect,
            chat.statement_index = question.statement_index,
            "Follow-up answered"
        );
        Ok(chat)
    }
}
