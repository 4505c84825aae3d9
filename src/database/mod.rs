// ABOUTME: Database connection management and schema migrations
// ABOUTME: SQLite pool with foreign keys enforced; per-table operations live in submodules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! # Database Management
//!
//! Users, conversations and chat turns are stored in SQLite through a shared
//! `sqlx` pool. Each submodule adds an `impl Database` block with its table's
//! migration and queries.

mod chats;
mod conversations;
mod users;

pub use chats::{ChatFilter, ChatRecord, NewChat};
pub use conversations::{ConversationRecord, NewConversation};
pub use users::UserRecord;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Database manager for all persisted entities
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to `database_url` and run migrations
    ///
    /// File databases (and their parent directory) are created when missing.
    /// `sqlite::memory:` databases use a single connection so every query
    /// sees the same schema.
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");
        if !in_memory {
            ensure_parent_dir(database_url)?;
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid DATABASE_URL: {database_url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.migrate().await?;
        info!(database.url = %database_url, "Database ready");
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        self.migrate_users().await?;
        self.migrate_conversations().await?;
        self.migrate_chats().await?;
        Ok(())
    }
}

/// Timestamp format used for every stored `created_at`/`updated_at`
///
/// Fixed-width RFC 3339 in UTC so lexical order equals chronological order.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }
    Ok(())
}
