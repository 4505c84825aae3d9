// ABOUTME: User account storage: credentials, display name, and personal AI key
// ABOUTME: Users are created at registration and never hard-deleted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use super::{now_timestamp, Database};
use anyhow::Result;
use counsel_core::errors::{AppError, AppResult};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use uuid::Uuid;

/// Database representation of a user account
#[derive(Clone)]
pub struct UserRecord {
    /// Unique user ID
    pub id: String,
    /// Login email (unique, stored lowercase)
    pub email: String,
    /// bcrypt hash
    pub password_hash: String,
    /// Optional display name
    pub display_name: Option<String>,
    /// Personal AI-provider credential
    pub api_key: Option<String>,
    /// When the account was created (RFC 3339)
    pub created_at: String,
    /// When the account was last modified (RFC 3339)
    pub updated_at: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("has_api_key", &self.api_key.is_some())
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

fn row_to_user(r: &SqliteRow) -> UserRecord {
    UserRecord {
        id: r.get("id"),
        email: r.get("email"),
        password_hash: r.get("password_hash"),
        display_name: r.get("display_name"),
        api_key: r.get("api_key"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

impl Database {
    pub(super) async fn migrate_users(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                display_name TEXT,
                api_key TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Create a new user
    ///
    /// Fails with `InvalidInput` when the email is already registered.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> AppResult<UserRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r"
            INSERT INTO users (id, email, password_hash, display_name, api_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NULL, $5, $5)
            ",
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::invalid_input("User with this email already exists")
            }
            other => AppError::database(format!("Failed to create user: {other}")),
        })?;

        Ok(UserRecord {
            id,
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            display_name: display_name.map(ToOwned::to_owned),
            api_key: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, email, password_hash, display_name, api_key, created_at, updated_at
            FROM users WHERE id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get user: {e}")))?;

        Ok(row.as_ref().map(row_to_user))
    }

    /// Get a user by login email
    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, email, password_hash, display_name, api_key, created_at, updated_at
            FROM users WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get user by email: {e}")))?;

        Ok(row.as_ref().map(row_to_user))
    }

    /// Set (`Some`) or clear (`None`) a user's personal AI key
    ///
    /// Returns `false` when the user does not exist.
    pub async fn set_user_api_key(&self, user_id: &str, api_key: Option<&str>) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET api_key = $1, updated_at = $2 WHERE id = $3")
            .bind(api_key)
            .bind(now_timestamp())
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to update API key: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Update a user's display name
    pub async fn update_display_name(&self, user_id: &str, name: &str) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE users SET display_name = $1, updated_at = $2 WHERE id = $3")
                .bind(name)
                .bind(now_timestamp())
                .bind(user_id)
                .execute(self.pool())
                .await
                .map_err(|e| AppError::database(format!("Failed to update profile: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_core::errors::ErrorCode;

    async fn db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let db = db().await;
        let user = db
            .create_user("clinician@example.org", "hash", Some("Dr. Kim"))
            .await
            .unwrap();

        let by_id = db.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "clinician@example.org");
        assert_eq!(by_id.display_name.as_deref(), Some("Dr. Kim"));

        let by_email = db
            .get_user_by_email("clinician@example.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
        assert!(db.get_user_by_email("nobody@example.org").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = db().await;
        db.create_user("dup@example.org", "hash", None).await.unwrap();
        let err = db.create_user("dup@example.org", "hash", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_set_and_clear_api_key() {
        let db = db().await;
        let user = db.create_user("key@example.org", "hash", None).await.unwrap();

        assert!(db.set_user_api_key(&user.id, Some("sk-test-1234")).await.unwrap());
        let stored = db.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.api_key.as_deref(), Some("sk-test-1234"));

        assert!(db.set_user_api_key(&user.id, None).await.unwrap());
        let cleared = db.get_user(&user.id).await.unwrap().unwrap();
        assert!(cleared.api_key.is_none());

        assert!(!db.set_user_api_key("missing", Some("x")).await.unwrap());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let user = UserRecord {
            id: "u1".into(),
            email: "a@b.c".into(),
            password_hash: "secret-hash".into(),
            display_name: None,
            api_key: Some("sk-secret".into()),
            created_at: String::new(),
            updated_at: String::new(),
        };
        let debug = format!("{user:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("secret-hash"));
    }
}
