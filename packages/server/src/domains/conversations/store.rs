//! Conversation memory backends.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, instrument};

use super::format::generate_conversation_title;
use super::models::{Conversation, StoredMessage};
use crate::domains::chat::Role;

/// Conversations listed per user.
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Current time at the precision messages are stored with.
pub fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Record one question/answer pair. The first exchange creates the
    /// conversation and titles it after the question.
    async fn save_exchange(
        &self,
        session_id: &str,
        question: &str,
        response: &str,
        user_id: Option<&str>,
        url: Option<&str>,
    ) -> Result<()>;

    /// A conversation with its messages. `None` when it does not exist or
    /// `user_id` is given and does not own it.
    async fn get(&self, session_id: &str, user_id: Option<&str>) -> Result<Option<Conversation>>;

    /// A user's conversations, newest first.
    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>>;

    /// Returns false when there was nothing to delete.
    async fn delete(&self, session_id: &str) -> Result<bool>;
}

fn owned_by(conversation: &Conversation, user_id: Option<&str>) -> bool {
    match user_id {
        Some(user_id) => conversation.user_id.as_deref() == Some(user_id),
        None => true,
    }
}

// =============================================================================
// PostgreSQL
// =============================================================================

#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    #[instrument(skip(self, question, response))]
    async fn save_exchange(
        &self,
        session_id: &str,
        question: &str,
        response: &str,
        user_id: Option<&str>,
        url: Option<&str>,
    ) -> Result<()> {
        let now = stored_now();

        match Conversation::find_by_session(session_id, &self.pool).await? {
            Some(_) => Conversation::touch(session_id, url, now, &self.pool).await?,
            None => {
                let title = generate_conversation_title(question);
                Conversation::insert(session_id, user_id, &title, url, now, &self.pool).await?;
                debug!(session_id = %session_id, title = %title, "Conversation created");
            }
        }

        StoredMessage::new(Role::User, question, now)
            .insert(session_id, &self.pool)
            .await?;
        StoredMessage::new(Role::Assistant, response, stored_now())
            .insert(session_id, &self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, session_id: &str, user_id: Option<&str>) -> Result<Option<Conversation>> {
        let Some(mut conversation) = Conversation::find_by_session(session_id, &self.pool).await?
        else {
            return Ok(None);
        };
        if !owned_by(&conversation, user_id) {
            return Ok(None);
        }

        conversation.messages = StoredMessage::find_by_session(session_id, &self.pool).await?;
        Ok(Some(conversation))
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>> {
        let mut conversations = Conversation::find_by_user(user_id, limit as i64, &self.pool).await?;

        let session_ids: Vec<String> = conversations.iter().map(|c| c.session_id.clone()).collect();
        let mut messages = StoredMessage::find_by_sessions(&session_ids, &self.pool).await?;
        for conversation in &mut conversations {
            conversation.messages = messages.remove(&conversation.session_id).unwrap_or_default();
        }
        Ok(conversations)
    }

    #[instrument(skip(self))]
    async fn delete(&self, session_id: &str) -> Result<bool> {
        Conversation::delete(session_id, &self.pool).await
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Conversation plus its creation order, which breaks `created_at` ties.
#[derive(Clone)]
struct MemoryEntry {
    seq: u64,
    conversation: Conversation,
}

#[derive(Clone, Default)]
pub struct MemoryConversationStore {
    conversations: Arc<RwLock<HashMap<String, MemoryEntry>>>,
    next_seq: Arc<AtomicU64>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn save_exchange(
        &self,
        session_id: &str,
        question: &str,
        response: &str,
        user_id: Option<&str>,
        url: Option<&str>,
    ) -> Result<()> {
        let now = stored_now();
        let mut conversations = self
            .conversations
            .write()
            .unwrap_or_else(|e| e.into_inner());

        let entry = conversations
            .entry(session_id.to_string())
            .or_insert_with(|| MemoryEntry {
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                conversation: Conversation {
                    session_id: session_id.to_string(),
                    user_id: user_id.map(str::to_string),
                    title: generate_conversation_title(question),
                    url: None,
                    created_at: now,
                    updated_at: now,
                    messages: Vec::new(),
                },
            });
        let conversation = &mut entry.conversation;

        if let Some(url) = url {
            conversation.url = Some(url.to_string());
        }
        conversation.updated_at = now;
        conversation
            .messages
            .push(StoredMessage::new(Role::User, question, now));
        conversation
            .messages
            .push(StoredMessage::new(Role::Assistant, response, now));
        Ok(())
    }

    async fn get(&self, session_id: &str, user_id: Option<&str>) -> Result<Option<Conversation>> {
        let conversations = self
            .conversations
            .read()
            .unwrap_or_else(|e| e.into_inner());
        Ok(conversations
            .get(session_id)
            .map(|entry| &entry.conversation)
            .filter(|c| owned_by(c, user_id))
            .cloned())
    }

    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>> {
        let conversations = self
            .conversations
            .read()
            .unwrap_or_else(|e| e.into_inner());

        let mut owned: Vec<&MemoryEntry> = conversations
            .values()
            .filter(|e| e.conversation.user_id.as_deref() == Some(user_id))
            .collect();
        owned.sort_by(|a, b| {
            b.conversation
                .created_at
                .cmp(&a.conversation.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        Ok(owned
            .into_iter()
            .take(limit)
            .map(|e| e.conversation.clone())
            .collect())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        Ok(self
            .conversations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_id)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_exchange_creates_titled_conversation() {
        let store = MemoryConversationStore::new();
        store
            .save_exchange("s1", "Do they sell my data?", "No.", Some("u1"), Some("https://a.com/"))
            .await
            .unwrap();
        store
            .save_exchange("s1", "And cookies?", "Yes, for analytics.", Some("u1"), None)
            .await
            .unwrap();

        let conversation = store.get("s1", None).await.unwrap().unwrap();
        assert_eq!(conversation.title, "Do they sell my data?");
        assert_eq!(conversation.url.as_deref(), Some("https://a.com/"));
        assert_eq!(conversation.messages.len(), 4);
        assert_eq!(conversation.messages[2].role, "user");
        assert_eq!(conversation.messages[3].content, "Yes, for analytics.");
        assert_eq!(conversation.messages[0].timestamp.timestamp_subsec_nanos(), 0);
    }

    #[tokio::test]
    async fn test_get_checks_owner() {
        let store = MemoryConversationStore::new();
        store.save_exchange("s1", "q", "a", Some("u1"), None).await.unwrap();

        assert!(store.get("s1", Some("u1")).await.unwrap().is_some());
        assert!(store.get("s1", Some("u2")).await.unwrap().is_none());
        assert!(store.get("missing", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = MemoryConversationStore::new();
        for i in 0..12 {
            store
                .save_exchange(&format!("s{:02}", i), "q", "a", Some("u1"), None)
                .await
                .unwrap();
        }
        store.save_exchange("other", "q", "a", Some("u2"), None).await.unwrap();

        let listed = store.list_for_user("u1", DEFAULT_LIST_LIMIT).await.unwrap();
        assert_eq!(listed.len(), 10);
        assert!(listed.iter().all(|c| c.user_id.as_deref() == Some("u1")));

        assert!(store.delete("s00").await.unwrap());
        assert!(!store.delete("s00").await.unwrap());
        assert_eq!(store.len(), 12);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_within_one_second() {
        let store = MemoryConversationStore::new();
        store.save_exchange("zeta", "older", "a", Some("u1"), None).await.unwrap();
        store.save_exchange("alpha", "newer", "a", Some("u1"), None).await.unwrap();
        store.save_exchange("zeta", "follow-up", "a", Some("u1"), None).await.unwrap();

        let listed = store.list_for_user("u1", DEFAULT_LIST_LIMIT).await.unwrap();
        let sessions: Vec<&str> = listed.iter().map(|c| c.session_id.as_str()).collect();
        assert_eq!(sessions, vec!["alpha", "zeta"]);
    }
}
