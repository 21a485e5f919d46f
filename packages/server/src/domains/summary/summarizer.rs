//! Privacy summaries for the browser extension.

use anyhow::Result;
use openai_client::Message;
use policy_index::{MetadataFilter, PolicyIndexer, DEFAULT_FETCH_K, DEFAULT_LAMBDA};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::models::PolicySummary;
use crate::kernel::BaseAI;

/// Chunks retrieved per summary.
pub const SUMMARY_K: usize = 4;

/// Clauses kept per summary.
pub const SUMMARY_CLAUSES: usize = 4;

pub const SUMMARY_QUERY: &str = "Summarize all clauses related to data sharing, user consent, third-party access, \
data retention, tracking, targeted advertising, user rights, and account deletion. \
Highlight anything that could affect user privacy or security.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a policy analyzer that extracts structured privacy clause summaries from legal content \
(e.g., Terms of Service, Privacy Policies). Your output will be used to populate a UI that flags risky clauses and summarizes user impact.";

const KNOWLEDGE_SYSTEM_PROMPT: &str = "You are a policy analyzer that generates structured privacy clause summaries based on your existing knowledge \
of specific companies and their privacy policies.

IMPORTANT: Only generate analysis if you have actual knowledge of the specific company's privacy policy from the provided URL. \
Do NOT generate generic or assumed information.

If you don't have specific knowledge about the company's actual privacy policy, return the error JSON format instead.";

const ERROR_FORMAT: &str = r#"{
  "error": true,
  "message": "Unable to find data due to bot protection rules",
  "riskLevel": "Unknown",
  "summaryText": "Data unavailable"
}"#;

const SUCCESS_FORMAT: &str = r#"{
  "error": false,
  "riskLevel": "Some risks found at github.com",
  "summaryText": "Data sharing is allowed with third parties.",
  "clauses": [
    {"type": "danger", "icon": "alert-triangle", "title": "Data Sharing", "description": "Your data may be shared with third parties such as vendors and partners."},
    {"type": "neutral", "icon": "database", "title": "Data Retention", "description": "Your data is stored for at least 6 months after your account is deleted."},
    {"type": "success", "icon": "check-circle", "title": "Location Tracking", "description": "Your location is not tracked."},
    {"type": "success", "icon": "check-circle", "title": "Data Security", "description": "Reasonable measures are used to protect your data."}
  ]
}"#;

fn summary_user_prompt(url: &str, policy_text: &str) -> String {
    format!(
        "Given the following policy text, analyze it and ensure the information is relevant to {url}. \
If the text is unrelated, generate the JSON in this format:

{ERROR_FORMAT}

Otherwise produce a valid JSON object using the structure below.
Return exactly {SUMMARY_CLAUSES} clauses. Each clause's description must not exceed 35 words.
Clause types are danger, warning, neutral or success.

Do NOT include variable names, markdown formatting, or explanations.

Example format:
{SUCCESS_FORMAT}

Policy Text:
\"\"\"
{policy_text}
\"\"\""
    )
}

fn knowledge_user_prompt(url: &str) -> String {
    format!(
        "Analyze the following URL and generate a privacy policy risk assessment ONLY if you have specific knowledge \
of this company's actual privacy policy practices.

URL: {url}

If you DO NOT have specific knowledge about this company's privacy policy, return this error format:
{ERROR_FORMAT}

If you DO have specific knowledge, produce a valid JSON object with exactly {SUMMARY_CLAUSES} clauses in this format. \
Each clause description must not exceed 35 words.

{SUCCESS_FORMAT}

Return ONLY the JSON object with no additional text, formatting, or explanations."
    )
}

#[derive(Clone)]
pub struct Summarizer {
    ai: Arc<dyn BaseAI>,
    indexer: Arc<PolicyIndexer>,
    model: String,
}

impl Summarizer {
    pub fn new(ai: Arc<dyn BaseAI>, indexer: Arc<PolicyIndexer>, model: impl Into<String>) -> Self {
        Self {
            ai,
            indexer,
            model: model.into(),
        }
    }

    /// Summary from the site's indexed documents, falling back to model knowledge.
    pub async fn summarize_site(&self, url: &str) -> Result<PolicySummary> {
        let filter = MetadataFilter::for_domain(url);
        let hits = self
            .indexer
            .retrieve_diverse(SUMMARY_QUERY, SUMMARY_K, DEFAULT_FETCH_K, DEFAULT_LAMBDA, Some(&filter))
            .await?;

        if hits.is_empty() {
            info!(url = %url, "No indexed documents, summarizing from model knowledge");
            return self.summarize_from_knowledge(url).await;
        }

        let policy_text = hits
            .iter()
            .map(|h| h.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        debug!(url = %url, chunks = hits.len(), "Summarizing indexed documents");

        let messages = vec![
            Message::system(SUMMARY_SYSTEM_PROMPT),
            Message::user(summary_user_prompt(url, &policy_text)),
        ];

        match self.request(messages).await {
            Some(summary) if summary.is_usable() => Ok(summary),
            _ => {
                info!(url = %url, "Summary unusable, summarizing from model knowledge");
                self.summarize_from_knowledge(url).await
            }
        }
    }

    /// Summary from what the model already knows about the company, or the
    /// unavailable object.
    pub async fn summarize_from_knowledge(&self, url: &str) -> Result<PolicySummary> {
        let messages = vec![
            Message::system(KNOWLEDGE_SYSTEM_PROMPT),
            Message::user(knowledge_user_prompt(url)),
        ];

        Ok(match self.request(messages).await {
            Some(summary) if summary.is_usable() => summary,
            _ => PolicySummary::unavailable(),
        })
    }

    async fn request(&self, messages: Vec<Message>) -> Option<PolicySummary> {
        let value = match self.ai.complete_json(&self.model, messages).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Summary request failed");
                return None;
            }
        };

        match serde_json::from_value::<PolicySummary>(value) {
            Ok(mut summary) => {
                summary.clauses.truncate(SUMMARY_CLAUSES);
                Some(summary)
            }
            Err(e) => {
                warn!(error = %e, "Summary response did not match the expected shape");
                None
            }
        }
    }
}
