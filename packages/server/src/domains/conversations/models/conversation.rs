use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::message::StoredMessage;

/// Conversation - one chat session and its messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub session_id: String,
    pub user_id: Option<String>,
    pub title: String,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub messages: Vec<StoredMessage>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Conversation {
    /// Find a conversation by session id (messages not loaded)
    pub async fn find_by_session(session_id: &str, pool: &PgPool) -> Result<Option<Self>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT session_id, user_id, title, url, created_at, updated_at
            FROM conversations
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(pool)
        .await?;
        Ok(conversation)
    }

    /// Newest conversations of a user (messages not loaded)
    pub async fn find_by_user(user_id: &str, limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT session_id, user_id, title, url, created_at, updated_at
            FROM conversations
            WHERE user_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(conversations)
    }

    /// Create the conversation row
    pub async fn insert(
        session_id: &str,
        user_id: Option<&str>,
        title: &str,
        url: Option<&str>,
        at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Self> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (session_id, user_id, title, url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING session_id, user_id, title, url, created_at, updated_at
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(title)
        .bind(url)
        .bind(at)
        .fetch_one(pool)
        .await?;
        Ok(conversation)
    }

    /// Bump updated_at, and the url when one is given
    pub async fn touch(session_id: &str, url: Option<&str>, at: DateTime<Utc>, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE conversations
            SET updated_at = $2, url = COALESCE($3, url)
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .bind(at)
        .bind(url)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete a conversation. Messages go with it (ON DELETE CASCADE).
    pub async fn delete(session_id: &str, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE session_id = $1")
            .bind(session_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
