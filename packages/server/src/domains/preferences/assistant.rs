use anyhow::{bail, Result};
use openai_client::Message;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::questions::next_question;
use crate::kernel::BaseAI;

const PREFERENCES_SYSTEM_PROMPT: &str = r#"You are a privacy assistant that helps users set up their personal data preferences for a privacy analyzer tool.

Your job is to guide the user through each privacy topic (like data sharing, location tracking, data sales, etc.) and collect their preferences in a structured JSON format.

At each step:
- Ask only one question.
- Wait for the user's answer.
- Update the preferences dictionary accordingly.
- If the user says something general like "I want max privacy," apply stricter defaults.
- If the user wants to change something they already answered, allow that.
- After each change, return the full updated preferences JSON.
- Do not include explanations or extra text outside the JSON.

Valid values:
- Boolean fields: true or false
- For `data_retention`, include `max_retention_days`
- For `third_party_integrations`, include `allowed_domains` (list of trusted domains)
- For `consent_mechanism`, `type` can be "opt_in", "opt_out", or "forced"

Respond only with the updated JSON preferences. Do not include anything else."#;

#[derive(Clone)]
pub struct PreferenceAssistant {
    ai: Arc<dyn BaseAI>,
    model: String,
}

impl PreferenceAssistant {
    pub fn new(ai: Arc<dyn BaseAI>, model: impl Into<String>) -> Self {
        Self {
            ai,
            model: model.into(),
        }
    }

    /// Apply a free-text answer to the preferences. Returns the full updated object.
    pub async fn update_preferences(&self, current: &Value, answer: &str) -> Result<Value> {
        let current = if current.is_null() {
            Value::Object(Default::default())
        } else {
            current.clone()
        };

        let asked = next_question(&current)
            .map(|q| format!("Question asked ({}): {}\n", q.field, q.question))
            .unwrap_or_default();

        let messages = vec![
            Message::system(PREFERENCES_SYSTEM_PROMPT),
            Message::user(format!(
                "Current preferences:\n{}\n\n{}User answer: {}",
                serde_json::to_string_pretty(&current)?,
                asked,
                answer
            )),
        ];

        let updated = self.ai.complete_json(&self.model, messages).await?;
        if !updated.is_object() {
            bail!("Preferences update must be a JSON object, got: {}", updated);
        }

        debug!(fields = updated.as_object().map_or(0, |o| o.len()), "Preferences updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::MockAI;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_preferences() {
        let ai = MockAI::new().with_response(r#"```json
{"data_sharing": false}
```"#);
        let assistant = PreferenceAssistant::new(Arc::new(ai.clone()), "gpt-4o-mini");

        let updated = assistant
            .update_preferences(&Value::Null, "No, never share my data")
            .await
            .unwrap();

        assert_eq!(updated, json!({"data_sharing": false}));
        let prompt = ai.calls()[0].text();
        assert!(prompt.contains("Question asked (data_sharing)"));
        assert!(prompt.contains("No, never share my data"));
    }

    #[tokio::test]
    async fn test_non_object_is_rejected() {
        let ai = MockAI::new().with_response("[true, false]");
        let assistant = PreferenceAssistant::new(Arc::new(ai), "gpt-4o-mini");

        assert!(assistant.update_preferences(&json!({}), "yes").await.is_err());
    }
}
