//! Per-message routing.
//!
//! Cheap checks run first (keywords, URLs, site status); the chat model is only
//! consulted once the site is known to have indexed documents.

use anyhow::Result;
use openai_client::Message;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::prompts::{CONVERSATION_KEYWORDS, SUPERVISOR_SYSTEM_PROMPT};
use super::state::{ChatState, Role};
use crate::domains::sites::{extract_site_url, SiteStatusCache};
use crate::kernel::{extract, BackgroundIndexer, BaseAI, DispatchOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Search,
    LlmAnswer,
    ScrapingInProgress,
    Finish,
    Error,
}

impl Route {
    /// Map the model's routing answer. Anything unrecognised becomes `LlmAnswer`.
    pub fn from_choice(choice: &str) -> Self {
        match choice.trim() {
            "FINISH" => Route::Finish,
            "search" => Route::Search,
            "llm_answer" => Route::LlmAnswer,
            "scraping_in_progress" => Route::ScrapingInProgress,
            _ => Route::LlmAnswer,
        }
    }
}

/// Structured routing answer from the chat model.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RouteChoice {
    /// One of FINISH, search, llm_answer, scraping_in_progress
    pub next: String,
}

#[derive(Clone)]
pub struct Supervisor {
    ai: Arc<dyn BaseAI>,
    model: String,
    sites: SiteStatusCache,
    background: BackgroundIndexer,
}

impl Supervisor {
    pub fn new(
        ai: Arc<dyn BaseAI>,
        model: impl Into<String>,
        sites: SiteStatusCache,
        background: BackgroundIndexer,
    ) -> Self {
        Self {
            ai,
            model: model.into(),
            sites,
            background,
        }
    }

    /// Pick the node that handles the latest message.
    pub async fn decide(&self, state: &mut ChatState) -> Route {
        let route = match self.try_decide(state).await {
            Ok(route) => route,
            Err(e) => {
                warn!(error = %e, "Routing failed");
                Route::Error
            }
        };
        info!(route = ?route, url = ?state.current_url, "Routed message");
        route
    }

    async fn try_decide(&self, state: &mut ChatState) -> Result<Route> {
        let question = match state.last_message() {
            Some(message) if message.role == Role::User => message.content.to_lowercase().trim().to_string(),
            _ => return Ok(Route::Finish),
        };
        state.current_query = Some(question.clone());

        if CONVERSATION_KEYWORDS.iter().any(|k| question.contains(k)) {
            debug!("Conversation-history question");
            return Ok(Route::LlmAnswer);
        }

        if let Some(url) = extract_site_url(&question) {
            debug!(url = %url, "URL in message");
            state.current_url = Some(url);
            return Ok(Route::Search);
        }

        let Some(url) = state.current_url.clone() else {
            return Ok(Route::LlmAnswer);
        };

        let Some(status) = self.sites.lookup(&url).await? else {
            if self.background.dispatch(&url) == DispatchOutcome::AlreadyRunning {
                debug!(url = %url, "Indexing already in flight");
            }
            return Ok(Route::ScrapingInProgress);
        };

        if !status.found_data {
            return Ok(Route::LlmAnswer);
        }

        let mut messages = vec![Message::system(SUPERVISOR_SYSTEM_PROMPT)];
        messages.extend(state.openai_messages());

        let choice: RouteChoice = extract(self.ai.as_ref(), &self.model, messages).await?;
        Ok(Route::from_choice(&choice.next))
    }
}
