//! OpenAI-backed embedder and metadata enricher.
//!
//! ```rust,ignore
//! use policy_index::openai::{OpenAIEmbedder, OpenAIEnricher};
//!
//! let client = openai_client::OpenAIClient::from_env()?;
//! let embedder = OpenAIEmbedder::new(client.clone());
//! let enricher = OpenAIEnricher::new(client).with_model("gpt-4o-mini");
//! ```

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OpenAIError};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{IndexError, Result};
use crate::traits::{Embedder, MetadataEnricher};

/// Texts per embeddings request.
const EMBEDDING_BATCH_SIZE: usize = 100;

fn ai_error(e: OpenAIError) -> IndexError {
    IndexError::Ai(Box::new(e))
}

/// Embedder using the OpenAI embeddings endpoint (default `text-embedding-3-small`).
#[derive(Clone)]
pub struct OpenAIEmbedder {
    client: OpenAIClient,
    model: String,
}

impl OpenAIEmbedder {
    pub fn new(client: OpenAIClient) -> Self {
        Self {
            client,
            model: "text-embedding-3-small".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.client
            .create_embedding(text, &self.model)
            .await
            .map_err(|e| IndexError::Embedding(e.to_string()))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            let vectors = self
                .client
                .create_embeddings_batch(&refs, &self.model)
                .await
                .map_err(|e| IndexError::Embedding(e.to_string()))?;
            embeddings.extend(vectors);
        }
        debug!(count = embeddings.len(), model = %self.model, "Embedded documents");
        Ok(embeddings)
    }
}

const ENRICH_SYSTEM_PROMPT: &str = "You are a policy analyzer that generates structured metadata \
for pre-chunked legal content (e.g., Terms of Service, Privacy Policies). Your output will be used \
for semantic retrieval, privacy risk detection, and clause-level reasoning in downstream AI applications.";

fn enrich_user_prompt(chunk_text: &str, site_url: &str, scrape_date: &str) -> String {
    format!(
        r#"Given the following policy text, generate a JSON object that includes structured metadata fields.

Use this schema. Omit any field whose value would be null:
- "domain": {site_url}
- "scrape_date": {scrape_date}
- "language": The detected language (e.g., "en").
- "policy_type": One of: "privacy_policy", "terms_of_service", "cookie_policy", "acceptable_use", "other"
- "risk_tags": comma separated detected privacy or legal risks (e.g., "data_sharing, location_tracking")
- "section_title": Descriptive title for this chunk. If none is found, infer one.
- "summary": A 1-2 sentence plain-English summary of what the chunk means.
- "categories": comma separated high-level topics (e.g., "data_collection, user_rights")
- "user_impact_level": One of "low", "medium", or "high" based on how much the policy affects the user's rights or data.

Return only one JSON object. No markdown, no code formatting, and no extra explanation.

Policy Text:
"""
{chunk_text}
""""#
    )
}

/// Metadata enricher prompting a chat model in JSON mode.
#[derive(Clone)]
pub struct OpenAIEnricher {
    client: OpenAIClient,
    model: String,
}

impl OpenAIEnricher {
    pub fn new(client: OpenAIClient) -> Self {
        Self {
            client,
            model: "gpt-4o-mini".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl MetadataEnricher for OpenAIEnricher {
    async fn enrich(
        &self,
        chunk_text: &str,
        site_url: &str,
        scrape_date: &str,
    ) -> Result<Map<String, Value>> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(ENRICH_SYSTEM_PROMPT))
            .message(Message::user(enrich_user_prompt(chunk_text, site_url, scrape_date)))
            .temperature(0.0);

        match self.client.json_completion(request).await.map_err(ai_error)? {
            Value::Object(map) => Ok(map),
            other => Err(IndexError::Ai(
                format!("expected a JSON object, got {}", other).into(),
            )),
        }
    }
}
