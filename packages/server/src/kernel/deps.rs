//! Server dependencies (using traits for testability)
//!
//! This module provides the central dependency container used by the chat graph
//! and the HTTP handlers. External services sit behind trait objects.

use sqlx::PgPool;
use std::sync::Arc;

use policy_index::PolicyIndexer;

use crate::domains::conversations::ConversationStore;
use crate::domains::grading::Grader;
use crate::domains::sites::SiteStatusCache;
use crate::kernel::{BackgroundIndexer, BaseAI};

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_UTILITY_MODEL: &str = "gpt-4o-mini";

/// Which model serves which purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Routing, search answers, general answers
    pub chat: String,
    /// Grading, summaries, preferences
    pub utility: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chat: DEFAULT_CHAT_MODEL.to_string(),
            utility: DEFAULT_UTILITY_MODEL.to_string(),
        }
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

#[derive(Clone)]
pub struct ServerDeps {
    /// `None` when running on in-memory stores
    pub db_pool: Option<PgPool>,
    pub ai: Arc<dyn BaseAI>,
    pub models: ModelConfig,
    pub indexer: Arc<PolicyIndexer>,
    pub sites: SiteStatusCache,
    pub background: BackgroundIndexer,
    pub conversations: Arc<dyn ConversationStore>,
    pub grader: Grader,
}

impl ServerDeps {
    /// Wire the background indexer and grader from the shared parts.
    pub fn new(
        db_pool: Option<PgPool>,
        ai: Arc<dyn BaseAI>,
        models: ModelConfig,
        indexer: Arc<PolicyIndexer>,
        sites: SiteStatusCache,
        conversations: Arc<dyn ConversationStore>,
        index_workers: usize,
    ) -> Self {
        let background = BackgroundIndexer::new(indexer.clone(), sites.clone(), index_workers);
        let grader = Grader::new(ai.clone(), indexer.embedder().clone(), models.utility.clone());

        Self {
            db_pool,
            ai,
            models,
            indexer,
            sites,
            background,
            conversations,
            grader,
        }
    }
}
