//! Pure OpenAI REST API client
//!
//! A small client for the pieces of the OpenAI API the policy assistant relies on:
//! chat completions, JSON-mode and JSON-schema structured outputs, and embeddings.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{OpenAIClient, ChatRequest, Message};
//!
//! let client = OpenAIClient::from_env()?;
//!
//! let reply = client
//!     .chat_completion(
//!         ChatRequest::new("gpt-4o")
//!             .message(Message::system("You are a privacy assistant."))
//!             .message(Message::user("What is a cookie policy?")),
//!     )
//!     .await?;
//!
//! let vectors = client
//!     .create_embeddings_batch(&["first chunk", "second chunk"], "text-embedding-3-small")
//!     .await?;
//! ```
//!
//! # Structured output
//!
//! ```rust,ignore
//! #[derive(Deserialize, JsonSchema)]
//! struct RouteChoice {
//!     next: String,
//! }
//!
//! let choice: RouteChoice = client
//!     .extract::<RouteChoice>("gpt-4o", vec![Message::system(prompt), Message::user(question)])
//!     .await?;
//! ```

pub mod error;
pub mod schema;
pub mod types;

pub use error::{OpenAIError, Result};
pub use schema::StructuredOutput;
pub use types::*;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Pure OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    ///
    /// Honors `OPENAI_BASE_URL` when set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        let client = Self::new(api_key);
        Ok(match std::env::var("OPENAI_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => client.with_base_url(url),
            _ => client,
        })
    }

    /// Set a custom base URL (for Azure, proxies, compatible gateways).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body to an API path and decode the JSON response.
    async fn post_json<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let response = self
            .http_client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(path = path, error = %e, "OpenAI request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(path = path, status = %status, error = %error_text, "OpenAI API error");
            return Err(OpenAIError::Api(format!("{} ({}): {}", path, status, error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))
    }

    /// Chat completion.
    ///
    /// Send messages to the chat completion API and get the first choice back.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();
        let raw: ChatResponseRaw = self.post_json("chat/completions", &request).await?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Api("No response from OpenAI".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            response_len = content.len(),
            "OpenAI chat completion"
        );

        Ok(ChatResponse {
            content,
            usage: raw.usage,
        })
    }

    /// JSON-mode completion.
    ///
    /// Forces `response_format = json_object` and parses the reply. Code fences
    /// some models still emit are stripped before parsing.
    pub async fn json_completion(&self, request: ChatRequest) -> Result<serde_json::Value> {
        let response = self
            .chat_completion(request.response_format(ResponseFormat::json_object()))
            .await?;

        serde_json::from_str(strip_code_blocks(&response.content)).map_err(|e| {
            OpenAIError::Parse(format!(
                "Invalid JSON from model: {} (response: {})",
                e,
                truncate_to_char_boundary(&response.content, 200)
            ))
        })
    }

    /// Type-safe structured output extraction.
    ///
    /// Generates a strict JSON schema for `T` and deserializes the reply into it.
    pub async fn extract<T: StructuredOutput>(
        &self,
        model: &str,
        messages: Vec<Message>,
    ) -> Result<T> {
        let schema = T::openai_schema();

        debug!(
            type_name = %T::type_name(),
            message_count = messages.len(),
            "Requesting structured output"
        );

        let request = ChatRequest {
            model: model.to_string(),
            messages,
            temperature: Some(0.0),
            ..Default::default()
        }
        .response_format(ResponseFormat::json_schema(T::type_name(), schema));

        let response = self.chat_completion(request).await?;

        serde_json::from_str(strip_code_blocks(&response.content))
            .map_err(|e| OpenAIError::Parse(format!("Failed to deserialize response: {}", e)))
    }

    /// Create an embedding for one text.
    pub async fn create_embedding(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        self.create_embeddings_batch(&[text], model)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::Api("No embedding from OpenAI".into()))
    }

    /// Create embeddings for multiple texts in a single request.
    ///
    /// Results come back in input order.
    pub async fn create_embeddings_batch(&self, texts: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: model.to_string(),
            input: texts.iter().map(|t| t.to_string()).collect(),
        };

        let mut response: EmbeddingResponse = self.post_json("embeddings", &request).await?;

        if response.data.len() != texts.len() {
            return Err(OpenAIError::Api(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}
