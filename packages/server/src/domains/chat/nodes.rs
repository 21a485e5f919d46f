//! Graph nodes. Each appends at most one assistant message and never fails.

use anyhow::Result;
use openai_client::Message;
use policy_index::{MetadataFilter, PolicyIndexer, ScoredChunk, DEFAULT_FETCH_K, DEFAULT_K, DEFAULT_LAMBDA};
use std::sync::Arc;
use tracing::{debug, warn};

use super::prompts::{
    GENERIC_ERROR_MESSAGE, LLM_ANSWER_SYSTEM_PROMPT, NO_DATA_MESSAGE, NO_URL_MESSAGE,
    SCRAPING_IN_PROGRESS_MESSAGE, SEARCH_NO_DOCUMENTS_PROMPT, SEARCH_SYSTEM_PROMPT,
};
use super::state::{ChatMessage, ChatState};
use crate::domains::grading::{ChunkGrade, Grader};
use crate::domains::sites::SiteStatusCache;
use crate::kernel::BaseAI;

/// Longest search reply, in characters.
pub const MAX_SEARCH_REPLY_CHARS: usize = 2000;

const TRUNCATION_SUFFIX: &str = "... [truncated for brevity]";

/// A retrieved chunk together with its grade.
#[derive(Debug, Clone)]
pub struct GradedChunk {
    pub chunk: ScoredChunk,
    pub grade: ChunkGrade,
}

/// MMR retrieval followed by composite grading, best first.
pub async fn retrieve_and_grade(
    indexer: &PolicyIndexer,
    grader: &Grader,
    query: &str,
    filter: Option<&MetadataFilter>,
) -> Result<Vec<GradedChunk>> {
    let hits = indexer
        .retrieve_diverse(query, DEFAULT_K, DEFAULT_FETCH_K, DEFAULT_LAMBDA, filter)
        .await?;

    let texts: Vec<String> = hits.iter().map(|h| h.chunk.content.clone()).collect();
    let grades = grader.composite_grade(&texts, query).await?;

    let mut graded: Vec<GradedChunk> = hits
        .into_iter()
        .zip(grades)
        .map(|(chunk, grade)| GradedChunk { chunk, grade })
        .collect();
    graded.sort_by(|a, b| b.grade.composite_score.total_cmp(&a.grade.composite_score));

    debug!(query = %query, chunks = graded.len(), "Retrieved and graded");
    Ok(graded)
}

/// Cut to `max_chars` characters and mark the cut.
pub fn truncate_reply(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &content[..idx], TRUNCATION_SUFFIX),
        None => content.to_string(),
    }
}

fn format_context(graded: &[GradedChunk]) -> String {
    graded
        .iter()
        .enumerate()
        .map(|(i, g)| {
            format!(
                "[{}] Source: {} (score {:.3})\n{}",
                i + 1,
                g.chunk.chunk.metadata.source,
                g.grade.composite_score,
                g.chunk.chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// =============================================================================
// Nodes
// =============================================================================

pub struct SearchNode {
    pub ai: Arc<dyn BaseAI>,
    pub model: String,
    pub indexer: Arc<PolicyIndexer>,
    pub grader: Grader,
}

impl SearchNode {
    pub async fn run(&self, state: &ChatState) -> ChatMessage {
        let content = match self.answer(state).await {
            Ok(answer) => truncate_reply(&answer, MAX_SEARCH_REPLY_CHARS),
            Err(e) => {
                warn!(error = %e, "Search failed");
                let error = e.to_string();
                format!(
                    "Search temporarily unavailable. Error: {}",
                    error.chars().take(100).collect::<String>()
                )
            }
        };
        ChatMessage::assistant(content).named("search")
    }

    async fn answer(&self, state: &ChatState) -> Result<String> {
        let query = state
            .current_query
            .clone()
            .or_else(|| state.last_user_message().map(str::to_string))
            .unwrap_or_default();
        let filter = state.current_url.as_deref().map(MetadataFilter::for_domain);

        let graded = retrieve_and_grade(&self.indexer, &self.grader, &query, filter.as_ref()).await?;

        let system = if graded.is_empty() {
            SEARCH_NO_DOCUMENTS_PROMPT.to_string()
        } else {
            format!(
                "{}\n\nPolicy excerpts for {}:\n\n{}",
                SEARCH_SYSTEM_PROMPT,
                state.current_url.as_deref().unwrap_or("the site"),
                format_context(&graded)
            )
        };

        let mut messages = vec![Message::system(system)];
        messages.extend(state.openai_messages());
        self.ai.complete(&self.model, messages).await
    }
}

pub struct LlmAnswerNode {
    pub ai: Arc<dyn BaseAI>,
    pub model: String,
}

impl LlmAnswerNode {
    pub async fn run(&self, state: &ChatState) -> ChatMessage {
        let mut messages = vec![Message::system(LLM_ANSWER_SYSTEM_PROMPT)];
        messages.extend(state.openai_messages());

        let content = match self.ai.complete(&self.model, messages).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "LLM answer failed");
                GENERIC_ERROR_MESSAGE.to_string()
            }
        };
        ChatMessage::assistant(content).named("llm_answer")
    }
}

pub fn scraping_in_progress_node() -> ChatMessage {
    ChatMessage::assistant(SCRAPING_IN_PROGRESS_MESSAGE).named("scraping_status")
}

pub struct ErrorNode {
    pub sites: SiteStatusCache,
}

impl ErrorNode {
    pub async fn run(&self, state: &ChatState) -> ChatMessage {
        let Some(url) = state.current_url.as_deref() else {
            return ChatMessage::assistant(NO_URL_MESSAGE);
        };

        match self.sites.lookup(url).await {
            Ok(Some(status)) if !status.found_data => ChatMessage::assistant(NO_DATA_MESSAGE),
            _ => ChatMessage::assistant(GENERIC_ERROR_MESSAGE),
        }
    }
}
