use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;

use crate::domains::chat::{ChatMessage, Role};

/// StoredMessage - one persisted chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredMessage {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            timestamp,
        }
    }

    /// Back to a graph message. Unknown roles are skipped.
    pub fn to_chat_message(&self) -> Option<ChatMessage> {
        match self.role.parse::<Role>().ok()? {
            Role::User => Some(ChatMessage::user(&self.content)),
            Role::Assistant => Some(ChatMessage::assistant(&self.content)),
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionMessageRow {
    session_id: String,
    role: String,
    content: String,
    timestamp: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl StoredMessage {
    /// Messages of a session, oldest first
    pub async fn find_by_session(session_id: &str, pool: &PgPool) -> Result<Vec<Self>> {
        let messages = sqlx::query_as::<_, StoredMessage>(
            r#"
            SELECT role, content, created_at AS "timestamp"
            FROM conversation_messages
            WHERE session_id = $1
            ORDER BY id
            "#,
        )
        .bind(session_id)
        .fetch_all(pool)
        .await?;
        Ok(messages)
    }

    /// Messages of several sessions, grouped by session id
    pub async fn find_by_sessions(
        session_ids: &[String],
        pool: &PgPool,
    ) -> Result<HashMap<String, Vec<Self>>> {
        let rows = sqlx::query_as::<_, SessionMessageRow>(
            r#"
            SELECT session_id, role, content, created_at AS "timestamp"
            FROM conversation_messages
            WHERE session_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(session_ids)
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<String, Vec<Self>> = HashMap::new();
        for row in rows {
            grouped.entry(row.session_id).or_default().push(StoredMessage {
                role: row.role,
                content: row.content,
                timestamp: row.timestamp,
            });
        }
        Ok(grouped)
    }

    /// Append a message to a session
    pub async fn insert(&self, session_id: &str, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversation_messages (session_id, role, content, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session_id)
        .bind(&self.role)
        .bind(&self.content)
        .bind(self.timestamp)
        .execute(pool)
        .await?;
        Ok(())
    }
}
