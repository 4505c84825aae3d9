// ABOUTME: Conversation route handlers for transcript submission and review
// ABOUTME: Submit, list, read, delete, follow-up chat, and the reconciled statement view
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! Conversation routes
//!
//! Short transcripts are analysed before the response is sent (`201`); long
//! ones are stored as `pending` and answered with `202`. Every lookup is scoped
//! to the caller, so another user's conversation is indistinguishable from a
//! missing one.

use super::{MessageResponse, Validator};
use crate::constants::limits::MAX_QUESTION_LENGTH_CHARS;
use crate::database::{ChatFilter, ChatRecord, ConversationRecord};
use crate::middleware::authenticate;
use crate::resources::ServerResources;
use crate::services::{
    reconcile, ConversationService, FollowUpQuestion, NewSubmission, ReconciledStatement,
    Submission,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use counsel_core::errors::{AppError, AppResult};
use counsel_core::models::{AnalysisResult, ConversationStatus, EvaluationAxis};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /conversations`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    /// Transcript
    pub text: Option<String>,
    /// Optional goal
    pub target_behavior: Option<String>,
}

/// Body of `POST /conversations/:id/chat`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Axis name
    pub aspect: Option<String>,
    /// Question text
    pub question: Option<String>,
    /// Transcript line index
    pub statement_index: Option<i64>,
    /// Defaults to `false`
    #[serde(default)]
    pub use_reference: bool,
    /// Defaults to `""`
    #[serde(default)]
    pub statement_content: String,
}

/// Query of `GET /conversations/:id/chat`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatQuery {
    /// Restrict to one axis
    pub aspect: Option<String>,
    /// Restrict to one transcript line
    pub statement_index: Option<String>,
}

/// Query of `GET /conversations/:id/statements`
#[derive(Debug, Default, Deserialize)]
pub struct StatementsQuery {
    /// Restrict to one axis
    pub aspect: Option<String>,
}

/// A conversation as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    /// Conversation id
    pub id: String,
    /// Transcript
    pub text: String,
    /// Optional goal
    pub target_behavior: Option<String>,
    /// Per-axis analysis, `{}` until completed
    pub analysis: AnalysisResult,
    /// Lifecycle status
    pub status: ConversationStatus,
    /// Completion email went out
    pub email_notified: bool,
    /// Creation time
    pub created_at: String,
}

impl From<ConversationRecord> for ConversationResponse {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: record.id,
            text: record.text,
            target_behavior: record.target_behavior,
            analysis: record.analysis,
            status: record.status,
            email_notified: record.email_notified,
            created_at: record.created_at,
        }
    }
}

/// A conversation with its chat history
#[derive(Debug, Serialize)]
pub struct ConversationDetailResponse {
    /// The conversation
    #[serde(flatten)]
    pub conversation: ConversationResponse,
    /// Every chat turn, oldest first
    pub chats: Vec<ChatResponse>,
}

/// A chat turn as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Chat id
    pub id: String,
    /// Owning conversation
    pub conversation_id: String,
    /// Axis discussed
    pub aspect: EvaluationAxis,
    /// Transcript line index
    pub statement_index: u32,
    /// Question asked
    pub user_question: String,
    /// Answer received
    pub ai_response: String,
    /// Reference material was requested
    pub use_reference: bool,
    /// Creation time
    pub created_at: String,
}

impl From<ChatRecord> for ChatResponse {
    fn from(chat: ChatRecord) -> Self {
        Self {
            id: chat.id,
            conversation_id: chat.conversation_id,
            aspect: chat.aspect,
            statement_index: chat.statement_index,
            user_question: chat.user_question,
            ai_response: chat.ai_response,
            use_reference: chat.use_reference,
            created_at: chat.created_at,
        }
    }
}

/// Reconciled transcript view
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementsResponse {
    /// Conversation id
    pub conversation_id: String,
    /// Axis filter applied, if any
    pub aspect: Option<EvaluationAxis>,
    /// Non-blank transcript lines with their evaluations
    pub statements: Vec<ReconciledStatement>,
}

fn parse_aspect(v: &mut Validator, raw: Option<&str>) -> Option<EvaluationAxis> {
    let raw = raw?;
    match raw.parse::<EvaluationAxis>() {
        Ok(axis) => Some(axis),
        Err(_) => {
            v.reject("aspect", "must be one of cct, sst, empathy, partnership");
            None
        }
    }
}

fn statement_index_from(v: &mut Validator, raw: i64) -> Option<u32> {
    if let Ok(index) = u32::try_from(raw) {
        Some(index)
    } else {
        v.reject("statementIndex", "must be a non-negative integer");
        None
    }
}

/// Conversation routes
pub struct ConversationRoutes;

impl ConversationRoutes {
    /// Create all conversation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/conversations",
                get(Self::handle_list).post(Self::handle_create),
            )
            .route(
                "/conversations/:id",
                get(Self::handle_get).delete(Self::handle_delete),
            )
            .route(
                "/conversations/:id/chat",
                get(Self::handle_list_chats).post(Self::handle_ask),
            )
            .route("/conversations/:id/statements", get(Self::handle_statements))
            .with_state(resources)
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<CreateConversationRequest>, JsonRejection>,
    ) -> AppResult<Response> {
        let auth = authenticate(&headers, &resources)?;
        let Json(request) = body?;

        let mut v = Validator::new();
        let text = v.require("text", request.text);
        if let Some(text) = &text {
            if text.trim().is_empty() {
                v.reject("text", "must not be empty");
            } else {
                v.length("text", text, 1, resources.config.limits.max_text_length);
            }
        }
        v.finish()?;
        let Some(text) = text else {
            return Err(AppError::internal("validated fields missing"));
        };
        let target_behavior = request
            .target_behavior
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());

        let service = ConversationService::new(resources);
        let response = match service
            .submit(&auth, NewSubmission { text, target_behavior })
            .await?
        {
            Submission::Analyzed(record) => {
                (StatusCode::CREATED, Json(ConversationResponse::from(record)))
            }
            Submission::Queued(record) => {
                (StatusCode::ACCEPTED, Json(ConversationResponse::from(record)))
            }
        };
        Ok(response.into_response())
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> AppResult<Json<Vec<ConversationResponse>>> {
        let auth = authenticate(&headers, &resources)?;
        let conversations = resources.database.list_conversations(&auth.user_id).await?;
        Ok(Json(
            conversations
                .into_iter()
                .map(ConversationResponse::from)
                .collect(),
        ))
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> AppResult<Json<ConversationDetailResponse>> {
        let auth = authenticate(&headers, &resources)?;
        let service = ConversationService::new(Arc::clone(&resources));
        let conversation = service.get_owned(&auth, &id).await?;
        let chats = resources
            .database
            .list_chats(&conversation.id, ChatFilter::default(), usize::MAX)
            .await?;

        Ok(Json(ConversationDetailResponse {
            conversation: conversation.into(),
            chats: chats.into_iter().map(ChatResponse::from).collect(),
        }))
    }

    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> AppResult<Json<MessageResponse>> {
        let auth = authenticate(&headers, &resources)?;
        if !resources
            .database
            .delete_conversation(&id, &auth.user_id)
            .await?
        {
            return Err(AppError::not_found("Conversation"));
        }
        Ok(Json(MessageResponse::new("Conversation deleted successfully")))
    }

    async fn handle_list_chats(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        query: Result<Query<ChatQuery>, QueryRejection>,
    ) -> AppResult<Json<Vec<ChatResponse>>> {
        let auth = authenticate(&headers, &resources)?;
        let Query(query) = query?;

        let mut v = Validator::new();
        let aspect = parse_aspect(&mut v, query.aspect.as_deref());
        let statement_index = match query.statement_index.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) => statement_index_from(&mut v, n),
                Err(_) => {
                    v.reject("statementIndex", "must be a non-negative integer");
                    None
                }
            },
        };
        v.finish()?;

        let service = ConversationService::new(Arc::clone(&resources));
        let conversation = service.get_owned(&auth, &id).await?;
        let chats = resources
            .database
            .list_chats(
                &conversation.id,
                ChatFilter {
                    aspect,
                    statement_index,
                },
                resources.config.limits.max_chat_history,
            )
            .await?;

        Ok(Json(chats.into_iter().map(ChatResponse::from).collect()))
    }

    async fn handle_ask(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        body: Result<Json<ChatRequest>, JsonRejection>,
    ) -> AppResult<Response> {
        let auth = authenticate(&headers, &resources)?;
        let Json(request) = body?;

        let mut v = Validator::new();
        let aspect = v
            .require("aspect", request.aspect.as_deref())
            .and_then(|raw| parse_aspect(&mut v, Some(raw)));
        let question = v.require("question", request.question);
        if let Some(question) = &question {
            if question.trim().is_empty() {
                v.reject("question", "must not be empty");
            } else {
                v.length("question", question, 1, MAX_QUESTION_LENGTH_CHARS);
            }
        }
        let statement_index = v
            .require("statementIndex", request.statement_index)
            .and_then(|n| statement_index_from(&mut v, n));
        v.finish()?;
        let (Some(aspect), Some(question), Some(statement_index)) =
            (aspect, question, statement_index)
        else {
            return Err(AppError::internal("validated fields missing"));
        };

        let service = ConversationService::new(resources);
        let chat = service
            .ask(
                &auth,
                &id,
                FollowUpQuestion {
                    aspect,
                    question,
                    statement_index,
                    statement_content: request.statement_content,
                    use_reference: request.use_reference,
                },
            )
            .await?;

        Ok((StatusCode::CREATED, Json(ChatResponse::from(chat))).into_response())
    }

    async fn handle_statements(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        query: Result<Query<StatementsQuery>, QueryRejection>,
    ) -> AppResult<Json<StatementsResponse>> {
        let auth = authenticate(&headers, &resources)?;
        let Query(query) = query?;

        let mut v = Validator::new();
        let aspect = parse_aspect(&mut v, query.aspect.as_deref());
        v.finish()?;

        let service = ConversationService::new(resources);
        let conversation = service.get_owned(&auth, &id).await?;
        let statements = reconcile(&conversation.text, &conversation.analysis, aspect);

        Ok(Json(StatementsResponse {
            conversation_id: conversation.id,
            aspect,
            statements,
        }))
    }
}
