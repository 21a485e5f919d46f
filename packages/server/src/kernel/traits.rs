// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Prompts and the meaning of replies live in domain modules.
//
// Naming convention: Base* for trait names (e.g., BaseAI)

use anyhow::{Context, Result};
use async_trait::async_trait;
use openai_client::{strip_code_blocks, Message, StructuredOutput};

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Chat completion over a message list (returns raw text response)
    async fn complete(&self, model: &str, messages: Vec<Message>) -> Result<String>;

    /// Chat completion expecting a JSON object
    async fn complete_json(&self, model: &str, messages: Vec<Message>) -> Result<serde_json::Value> {
        // Default implementation parses whatever complete returns
        let raw = self.complete(model, messages).await?;
        serde_json::from_str(strip_code_blocks(&raw)).context("Model returned invalid JSON")
    }

    /// Chat completion constrained by a JSON schema
    async fn generate_structured(
        &self,
        model: &str,
        messages: Vec<Message>,
        name: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        // Default implementation ignores the schema and prompts for JSON
        let _ = (name, schema);
        self.complete_json(model, messages).await
    }
}

/// Typed structured output on top of [`BaseAI::generate_structured`].
pub async fn extract<T: StructuredOutput>(
    ai: &dyn BaseAI,
    model: &str,
    messages: Vec<Message>,
) -> Result<T> {
    let value = ai
        .generate_structured(model, messages, &T::type_name(), T::openai_schema())
        .await?;
    serde_json::from_value(value)
        .with_context(|| format!("Structured output did not match {}", T::type_name()))
}
