// ABOUTME: Conversation storage: transcript, analysis payload, and analysis status
// ABOUTME: Status changes are compare-and-set so a conversation only moves forward
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use super::{now_timestamp, Database};
use anyhow::Result;
use counsel_core::errors::{AppError, AppResult};
use counsel_core::models::{AnalysisResult, ConversationStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Database representation of a submitted transcript
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    /// Unique conversation ID
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Raw transcript text
    pub text: String,
    /// Optional goal the clinician is working on
    pub target_behavior: Option<String>,
    /// Per-axis analysis; empty until analysis completes
    pub analysis: AnalysisResult,
    /// Analysis lifecycle status
    pub status: ConversationStatus,
    /// Whether the completion email went out
    pub email_notified: bool,
    /// When the conversation was submitted (RFC 3339)
    pub created_at: String,
}

/// Fields supplied when storing a conversation
#[derive(Debug, Clone)]
pub struct NewConversation<'a> {
    /// Owning user
    pub user_id: &'a str,
    /// Raw transcript text
    pub text: &'a str,
    /// Optional goal
    pub target_behavior: Option<&'a str>,
    /// Initial status (`completed` for synchronous analysis, `pending` otherwise)
    pub status: ConversationStatus,
    /// Initial analysis payload
    pub analysis: &'a AnalysisResult,
}

const CONVERSATION_COLUMNS: &str =
    "id, user_id, text, target_behavior, analysis, status, email_notified, created_at";

fn row_to_conversation(r: &SqliteRow) -> AppResult<ConversationRecord> {
    let analysis_json: String = r.get("analysis");
    let status: String = r.get("status");

    Ok(ConversationRecord {
        id: r.get("id"),
        user_id: r.get("user_id"),
        text: r.get("text"),
        target_behavior: r.get("target_behavior"),
        analysis: serde_json::from_str(&analysis_json)?,
        status: status
            .parse()
            .map_err(|e| AppError::database(format!("Corrupt conversation row: {e}")))?,
        email_notified: r.get("email_notified"),
        created_at: r.get("created_at"),
    })
}

impl Database {
    pub(super) async fn migrate_conversations(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text TEXT NOT NULL,
                target_behavior TEXT,
                analysis TEXT NOT NULL DEFAULT '{}',
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
                email_notified BOOLEAN NOT NULL DEFAULT false,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_user_created ON conversations(user_id, created_at)",
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Store a new conversation
    pub async fn create_conversation(
        &self,
        new: NewConversation<'_>,
    ) -> AppResult<ConversationRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let analysis_json = serde_json::to_string(new.analysis)?;

        sqlx::query(
            r"
            INSERT INTO conversations (id, user_id, text, target_behavior, analysis, status, email_notified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, false, $7)
            ",
        )
        .bind(&id)
        .bind(new.user_id)
        .bind(new.text)
        .bind(new.target_behavior)
        .bind(&analysis_json)
        .bind(new.status.as_str())
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation: {e}")))?;

        Ok(ConversationRecord {
            id,
            user_id: new.user_id.to_owned(),
            text: new.text.to_owned(),
            target_behavior: new.target_behavior.map(ToOwned::to_owned),
            analysis: new.analysis.clone(),
            status: new.status,
            email_notified: false,
            created_at: now,
        })
    }

    /// Get a conversation owned by `user_id`
    ///
    /// A conversation owned by someone else is reported as absent.
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1 AND user_id = $2"
        ))
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get conversation: {e}")))?;

        row.as_ref().map(row_to_conversation).transpose()
    }

    /// List a user's conversations, newest first
    pub async fn list_conversations(&self, user_id: &str) -> AppResult<Vec<ConversationRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE user_id = $1 \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to list conversations: {e}")))?;

        rows.iter().map(row_to_conversation).collect()
    }

    /// Move a conversation from `from` to `to`
    ///
    /// Returns `false` when the stored status was no longer `from`.
    pub async fn transition_conversation_status(
        &self,
        conversation_id: &str,
        from: ConversationStatus,
        to: ConversationStatus,
    ) -> AppResult<bool> {
        if !from.can_transition_to(to) {
            return Err(AppError::internal(format!(
                "Illegal conversation status transition {from} -> {to}"
            )));
        }

        let result = sqlx::query("UPDATE conversations SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to.as_str())
            .bind(conversation_id)
            .bind(from.as_str())
            .execute(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to update conversation status: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Store the analysis and move `processing -> completed` in one statement
    pub async fn complete_conversation_analysis(
        &self,
        conversation_id: &str,
        analysis: &AnalysisResult,
    ) -> AppResult<bool> {
        let analysis_json = serde_json::to_string(analysis)?;

        let result = sqlx::query(
            r"
            UPDATE conversations SET analysis = $1, status = $2
            WHERE id = $3 AND status = $4
            ",
        )
        .bind(&analysis_json)
        .bind(ConversationStatus::Completed.as_str())
        .bind(conversation_id)
        .bind(ConversationStatus::Processing.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to store analysis: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Record that the completion email was delivered
    pub async fn mark_email_notified(&self, conversation_id: &str) -> AppResult<()> {
        sqlx::query("UPDATE conversations SET email_notified = true WHERE id = $1")
            .bind(conversation_id)
            .execute(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to mark email notified: {e}")))?;

        Ok(())
    }

    /// Hard-delete a conversation (and, by cascade, its chats)
    ///
    /// Returns `false` when nothing owned by `user_id` matched.
    pub async fn delete_conversation(&self, conversation_id: &str, user_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(conversation_id)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to delete conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_core::models::{AnalysisStatement, EvaluationAxis};

    async fn setup() -> (Database, String) {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let user = db.create_user("owner@example.org", "hash", None).await.unwrap();
        (db, user.id)
    }

    async fn pending(db: &Database, user_id: &str) -> ConversationRecord {
        db.create_conversation(NewConversation {
            user_id,
            text: "Counselor: Hello\nClient: Hi",
            target_behavior: None,
            status: ConversationStatus::Pending,
            analysis: &AnalysisResult::empty(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_ownership_scoping() {
        let (db, owner) = setup().await;
        let other = db.create_user("other@example.org", "hash", None).await.unwrap();
        let conv = pending(&db, &owner).await;

        assert!(db.get_conversation(&conv.id, &owner).await.unwrap().is_some());
        assert!(db.get_conversation(&conv.id, &other.id).await.unwrap().is_none());
        assert!(!db.delete_conversation(&conv.id, &other.id).await.unwrap());
        assert!(db.delete_conversation(&conv.id, &owner).await.unwrap());
        assert!(db.get_conversation(&conv.id, &owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (db, owner) = setup().await;
        let first = pending(&db, &owner).await;
        let second = pending(&db, &owner).await;

        let listed = db.list_conversations(&owner).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    }

    #[tokio::test]
    async fn test_status_only_moves_forward() {
        let (db, owner) = setup().await;
        let conv = pending(&db, &owner).await;

        assert!(db
            .transition_conversation_status(
                &conv.id,
                ConversationStatus::Pending,
                ConversationStatus::Processing
            )
            .await
            .unwrap());
        // Second claim loses the race
        assert!(!db
            .transition_conversation_status(
                &conv.id,
                ConversationStatus::Pending,
                ConversationStatus::Processing
            )
            .await
            .unwrap());

        let analysis = AnalysisResult::from_axes(
            vec![AnalysisStatement {
                statement: "Hello".into(),
                ..AnalysisStatement::default()
            }],
            vec![],
            vec![],
            vec![],
        );
        assert!(db.complete_conversation_analysis(&conv.id, &analysis).await.unwrap());
        assert!(!db
            .transition_conversation_status(
                &conv.id,
                ConversationStatus::Processing,
                ConversationStatus::Failed
            )
            .await
            .unwrap());

        let stored = db.get_conversation(&conv.id, &owner).await.unwrap().unwrap();
        assert_eq!(stored.status, ConversationStatus::Completed);
        assert_eq!(stored.analysis.axis(EvaluationAxis::Cct)[0].statement, "Hello");
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let (db, owner) = setup().await;
        let conv = pending(&db, &owner).await;
        assert!(db
            .transition_conversation_status(
                &conv.id,
                ConversationStatus::Completed,
                ConversationStatus::Processing
            )
            .await
            .is_err());
    }
}
