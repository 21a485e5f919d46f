// AI implementation using OpenAI
//
// This is the infrastructure implementation of BaseAI.
// Business logic (what to prompt for) lives in domain layers.

use anyhow::Result;
use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, ResponseFormat};

use super::BaseAI;

/// Sampling temperature for chat answers.
const CHAT_TEMPERATURE: f32 = 0.3;

/// Reply budget for chat answers.
const CHAT_TOKEN_LIMIT: u32 = 1500;

#[async_trait]
impl BaseAI for OpenAIClient {
    async fn complete(&self, model: &str, messages: Vec<Message>) -> Result<String> {
        let request = ChatRequest::new(model)
            .messages(messages)
            .temperature(CHAT_TEMPERATURE)
            .token_limit(CHAT_TOKEN_LIMIT);

        let response = self
            .chat_completion(request)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(response.content)
    }

    async fn complete_json(&self, model: &str, messages: Vec<Message>) -> Result<serde_json::Value> {
        let request = ChatRequest::new(model).messages(messages).temperature(0.2);

        self.json_completion(request)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn generate_structured(
        &self,
        model: &str,
        messages: Vec<Message>,
        name: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = ChatRequest::new(model)
            .messages(messages)
            .temperature(0.0)
            .response_format(ResponseFormat::json_schema(name, schema));

        let response = self
            .chat_completion(request)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        serde_json::from_str(openai_client::strip_code_blocks(&response.content))
            .map_err(|e| anyhow::anyhow!("Failed to parse structured output: {}", e))
    }
}
