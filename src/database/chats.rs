// ABOUTME: Follow-up chat storage scoped to (conversation, axis, statement index)
// ABOUTME: Chat turns are immutable and ordered by creation time within their group
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use super::{now_timestamp, Database};
use anyhow::Result;
use counsel_core::errors::{AppError, AppResult};
use counsel_core::models::EvaluationAxis;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Database representation of one follow-up question and its answer
#[derive(Debug, Clone)]
pub struct ChatRecord {
    /// Unique chat ID
    pub id: String,
    /// Parent conversation
    pub conversation_id: String,
    /// Axis the question is about
    pub aspect: EvaluationAxis,
    /// Transcript line the question is about
    pub statement_index: u32,
    /// Question text
    pub user_question: String,
    /// Analysis Service answer
    pub ai_response: String,
    /// Whether reference material was requested
    pub use_reference: bool,
    /// When the turn was stored (RFC 3339)
    pub created_at: String,
}

/// Fields supplied when storing a chat turn
#[derive(Debug, Clone)]
pub struct NewChat<'a> {
    /// Parent conversation
    pub conversation_id: &'a str,
    /// Axis
    pub aspect: EvaluationAxis,
    /// Transcript line
    pub statement_index: u32,
    /// Question text
    pub user_question: &'a str,
    /// Answer text
    pub ai_response: &'a str,
    /// Reference flag
    pub use_reference: bool,
}

/// Optional narrowing of a chat listing
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatFilter {
    /// Only turns about this axis
    pub aspect: Option<EvaluationAxis>,
    /// Only turns about this transcript line
    pub statement_index: Option<u32>,
}

fn row_to_chat(r: &SqliteRow) -> AppResult<ChatRecord> {
    let aspect: String = r.get("aspect");
    let statement_index: i64 = r.get("statement_index");

    Ok(ChatRecord {
        id: r.get("id"),
        conversation_id: r.get("conversation_id"),
        aspect: aspect
            .parse()
            .map_err(|e| AppError::database(format!("Corrupt chat row: {e}")))?,
        statement_index: u32::try_from(statement_index)
            .map_err(|e| AppError::database(format!("Corrupt chat row: {e}")))?,
        user_question: r.get("user_question"),
        ai_response: r.get("ai_response"),
        use_reference: r.get("use_reference"),
        created_at: r.get("created_at"),
    })
}

fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl Database {
    pub(super) async fn migrate_chats(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                aspect TEXT NOT NULL CHECK (aspect IN ('cct', 'sst', 'empathy', 'partnership')),
                statement_index INTEGER NOT NULL CHECK (statement_index >= 0),
                user_question TEXT NOT NULL,
                ai_response TEXT NOT NULL,
                use_reference BOOLEAN NOT NULL DEFAULT false,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chats_group ON chats(conversation_id, aspect, statement_index, created_at)",
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Store a chat turn
    pub async fn create_chat(&self, new: NewChat<'_>) -> AppResult<ChatRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r"
            INSERT INTO chats (id, conversation_id, aspect, statement_index, user_question, ai_response, use_reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(&id)
        .bind(new.conversation_id)
        .bind(new.aspect.as_str())
        .bind(i64::from(new.statement_index))
        .bind(new.user_question)
        .bind(new.ai_response)
        .bind(new.use_reference)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to create chat: {e}")))?;

        Ok(ChatRecord {
            id,
            conversation_id: new.conversation_id.to_owned(),
            aspect: new.aspect,
            statement_index: new.statement_index,
            user_question: new.user_question.to_owned(),
            ai_response: new.ai_response.to_owned(),
            use_reference: new.use_reference,
            created_at: now,
        })
    }

    /// List a conversation's chat turns, oldest first, at most `limit` rows
    pub async fn list_chats(
        &self,
        conversation_id: &str,
        filter: ChatFilter,
        limit: usize,
    ) -> AppResult<Vec<ChatRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, aspect, statement_index, user_question, ai_response, use_reference, created_at
            FROM chats
            WHERE conversation_id = $1
              AND ($2 IS NULL OR aspect = $2)
              AND ($3 IS NULL OR statement_index = $3)
            ORDER BY created_at ASC, rowid ASC
            LIMIT $4
            ",
        )
        .bind(conversation_id)
        .bind(filter.aspect.map(EvaluationAxis::as_str))
        .bind(filter.statement_index.map(i64::from))
        .bind(to_limit(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to list chats: {e}")))?;

        rows.iter().map(row_to_chat).collect()
    }

    /// The first `limit` turns of one (axis, statement) group, oldest first
    pub async fn statement_chat_history(
        &self,
        conversation_id: &str,
        aspect: EvaluationAxis,
        statement_index: u32,
        limit: usize,
    ) -> AppResult<Vec<ChatRecord>> {
        self.list_chats(
            conversation_id,
            ChatFilter {
                aspect: Some(aspect),
                statement_index: Some(statement_index),
            },
            limit,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NewConversation;
    use counsel_core::models::{AnalysisResult, ConversationStatus};

    async fn setup() -> (Database, String, String) {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let user = db.create_user("chat@example.org", "hash", None).await.unwrap();
        let conv = db
            .create_conversation(NewConversation {
                user_id: &user.id,
                text: "A\nB\nC",
                target_behavior: None,
                status: ConversationStatus::Completed,
                analysis: &AnalysisResult::from_axes(vec![], vec![], vec![], vec![]),
            })
            .await
            .unwrap();
        (db, user.id, conv.id)
    }

    async fn ask(db: &Database, conv: &str, aspect: EvaluationAxis, index: u32, q: &str) {
        db.create_chat(NewChat {
            conversation_id: conv,
            aspect,
            statement_index: index,
            user_question: q,
            ai_response: "answer",
            use_reference: false,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_filters() {
        let (db, _, conv) = setup().await;
        ask(&db, &conv, EvaluationAxis::Empathy, 2, "q1").await;
        ask(&db, &conv, EvaluationAxis::Empathy, 1, "q2").await;
        ask(&db, &conv, EvaluationAxis::Cct, 2, "q3").await;

        let all = db.list_chats(&conv, ChatFilter::default(), 50).await.unwrap();
        assert_eq!(all.len(), 3);

        let scoped = db
            .list_chats(
                &conv,
                ChatFilter {
                    aspect: Some(EvaluationAxis::Empathy),
                    statement_index: Some(2),
                },
                50,
            )
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].user_question, "q1");

        let by_index = db
            .list_chats(
                &conv,
                ChatFilter {
                    aspect: None,
                    statement_index: Some(2),
                },
                50,
            )
            .await
            .unwrap();
        assert_eq!(by_index.len(), 2);
    }

    #[tokio::test]
    async fn test_history_is_oldest_turns_in_order() {
        let (db, _, conv) = setup().await;
        for q in ["one", "two", "three", "four"] {
            ask(&db, &conv, EvaluationAxis::Sst, 0, q).await;
        }
        ask(&db, &conv, EvaluationAxis::Sst, 1, "other statement").await;

        let history = db
            .statement_chat_history(&conv, EvaluationAxis::Sst, 0, 2)
            .await
            .unwrap();
        let questions: Vec<_> = history.iter().map(|c| c.user_question.as_str()).collect();
        assert_eq!(questions, vec!["one", "two"]);

        let history = db
            .statement_chat_history(&conv, EvaluationAxis::Sst, 0, 50)
            .await
            .unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[3].user_question, "four");

        let listed = db.list_chats(&conv, ChatFilter::default(), 2).await.unwrap();
        let questions: Vec<_> = listed.iter().map(|c| c.user_question.as_str()).collect();
        assert_eq!(questions, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_chats_removed_with_conversation() {
        let (db, user, conv) = setup().await;
        ask(&db, &conv, EvaluationAxis::Partnership, 0, "q").await;
        assert!(db.delete_conversation(&conv, &user).await.unwrap());
        assert!(db
            .list_chats(&conv, ChatFilter::default(), 50)
            .await
            .unwrap()
            .is_empty());
    }
}
