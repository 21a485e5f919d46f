// TestDependencies - mock implementations for testing
//
// Builds a ServerDeps backed by in-memory stores and scripted AI replies.

use anyhow::Result;
use async_trait::async_trait;
use openai_client::Message;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use policy_index::testing::{MockEmbedder, MockRenderer};
use policy_index::{MemoryStore, PolicyIndexer, PolicyScraper};

use super::{BaseAI, ModelConfig, ServerDeps};
use crate::domains::conversations::MemoryConversationStore;
use crate::domains::sites::{MemorySiteRegistry, SiteStatusCache};

// =============================================================================
// Mock AI
// =============================================================================

/// Arguments captured from a completion call
#[derive(Debug, Clone)]
pub struct MockAICall {
    pub model: String,
    pub messages: Vec<Message>,
}

impl MockAICall {
    /// System prompt of the call, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
    }

    /// All message contents joined by newlines
    pub fn text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Replies are consumed in order; once the queue is empty the default reply is used.
#[derive(Clone)]
pub struct MockAI {
    responses: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
    default_response: String,
    calls: Arc<Mutex<Vec<MockAICall>>>,
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            default_response: "Mock response".to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a reply
    pub fn with_response(self, response: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(response.to_string()));
        self
    }

    /// Queue a failure
    pub fn with_error(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// Get all calls made to this mock
    pub fn calls(&self) -> Vec<MockAICall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(&self, model: &str, messages: Vec<Message>) -> Result<String> {
        self.calls.lock().unwrap().push(MockAICall {
            model: model.to_string(),
            messages,
        });

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(self.default_response.clone()),
        }
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

pub struct TestDependencies {
    pub ai: MockAI,
    pub embedder: MockEmbedder,
    pub renderer: MockRenderer,
    pub store: Arc<MemoryStore>,
    pub sites: MemorySiteRegistry,
    pub conversations: MemoryConversationStore,
    pub models: ModelConfig,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            ai: MockAI::new(),
            embedder: MockEmbedder::new(),
            renderer: MockRenderer::new(),
            store: Arc::new(MemoryStore::new()),
            sites: MemorySiteRegistry::new(),
            conversations: MemoryConversationStore::new(),
            models: ModelConfig::default(),
        }
    }

    /// Set a mock AI
    pub fn mock_ai(mut self, ai: MockAI) -> Self {
        self.ai = ai;
        self
    }

    /// Set the pages the scraper will see
    pub fn mock_renderer(mut self, renderer: MockRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Seed an index status for a site
    pub fn with_site(mut self, url: &str, found_data: bool, issue: Option<&str>) -> Self {
        self.sites = self.sites.with_status(url, found_data, issue);
        self
    }

    /// Convert into ServerDeps. The mocks stay shared with `self`'s clones.
    pub fn into_deps(self) -> Result<ServerDeps> {
        let scraper = PolicyScraper::new(Arc::new(self.renderer))?;
        let indexer = PolicyIndexer::new(Arc::new(scraper), Arc::new(self.embedder), self.store);
        let sites = SiteStatusCache::new(Arc::new(self.sites), 10);

        Ok(ServerDeps::new(
            None,
            Arc::new(self.ai),
            self.models,
            Arc::new(indexer),
            sites,
            Arc::new(self.conversations),
            2,
        ))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
