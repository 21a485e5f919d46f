//! Composite passage grading.
//!
//! composite = 0.4 * similarity + 0.3 * relevance/5 + 0.15 * completeness/5 + 0.15 * faithfulness/5

use anyhow::Result;
use openai_client::Message;
use policy_index::{cosine_similarity, Embedder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::kernel::BaseAI;

const SIMILARITY_WEIGHT: f32 = 0.4;
const RELEVANCE_WEIGHT: f32 = 0.3;
const COMPLETENESS_WEIGHT: f32 = 0.15;
const FAITHFULNESS_WEIGHT: f32 = 0.15;

const GRADER_SYSTEM_PROMPT: &str = "Evaluate the following chunk for how well it answers the user query.";

fn grader_user_prompt(query: &str, chunk: &str) -> String {
    format!(
        r#"Return only one valid JSON object. Do not include any explanation, markdown, or formatting.

Query:
{query}

Chunk:
{chunk}

Rate each from 1 to 5:
- relevance
- completeness
- faithfulness

Respond with a JSON object in this exact format:
{{"relevance": 5, "completeness": 4, "faithfulness": 5}}"#
    )
}

/// LLM ratings for one chunk, each in 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRating {
    pub relevance: u8,
    pub completeness: u8,
    pub faithfulness: u8,
}

impl ChunkRating {
    /// Rating used when the model could not rate a chunk.
    pub const MINIMUM: ChunkRating = ChunkRating {
        relevance: 1,
        completeness: 1,
        faithfulness: 1,
    };

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        let field = |name: &str| {
            let v = value.get(name)?;
            let n = v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64))?;
            Some(n.clamp(1, 5) as u8)
        };
        Some(Self {
            relevance: field("relevance")?,
            completeness: field("completeness")?,
            faithfulness: field("faithfulness")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkGrade {
    pub chunk: String,
    pub similarity: f32,
    pub relevance: u8,
    pub completeness: u8,
    pub faithfulness: u8,
    pub composite_score: f32,
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

fn composite(similarity: f32, rating: ChunkRating) -> f32 {
    SIMILARITY_WEIGHT * similarity
        + RELEVANCE_WEIGHT * rating.relevance as f32 / 5.0
        + COMPLETENESS_WEIGHT * rating.completeness as f32 / 5.0
        + FAITHFULNESS_WEIGHT * rating.faithfulness as f32 / 5.0
}

#[derive(Clone)]
pub struct Grader {
    ai: Arc<dyn BaseAI>,
    embedder: Arc<dyn Embedder>,
    model: String,
}

impl Grader {
    pub fn new(ai: Arc<dyn BaseAI>, embedder: Arc<dyn Embedder>, model: impl Into<String>) -> Self {
        Self {
            ai,
            embedder,
            model: model.into(),
        }
    }

    /// Mean cosine similarity of the chunks to the query (0 for no chunks).
    pub async fn similarity_score(&self, chunks: &[String], query: &str) -> Result<f32> {
        let sims = self.similarities(chunks, query).await?;
        if sims.is_empty() {
            return Ok(0.0);
        }
        Ok(sims.iter().sum::<f32>() / sims.len() as f32)
    }

    async fn similarities(&self, chunks: &[String], query: &str) -> Result<Vec<f32>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed_query(query).await?;
        let chunk_embeddings = self.embedder.embed_documents(chunks).await?;
        Ok(chunk_embeddings
            .iter()
            .map(|e| cosine_similarity(&query_embedding, e))
            .collect())
    }

    /// Ask the model to rate one chunk. Failures fall back to [`ChunkRating::MINIMUM`].
    pub async fn rate(&self, chunk: &str, query: &str) -> ChunkRating {
        let messages = vec![
            Message::system(GRADER_SYSTEM_PROMPT),
            Message::user(grader_user_prompt(query, chunk)),
        ];

        match self.ai.complete_json(&self.model, messages).await {
            Ok(value) => ChunkRating::from_json(&value).unwrap_or_else(|| {
                warn!(response = %value, "Rating response missing fields");
                ChunkRating::MINIMUM
            }),
            Err(e) => {
                warn!(error = %e, "Chunk rating failed");
                ChunkRating::MINIMUM
            }
        }
    }

    /// Grade every chunk, in input order.
    pub async fn composite_grade(&self, chunks: &[String], query: &str) -> Result<Vec<ChunkGrade>> {
        let similarities = self.similarities(chunks, query).await?;

        let ratings =
            futures::future::join_all(chunks.iter().map(|chunk| self.rate(chunk, query))).await;

        let grades: Vec<ChunkGrade> = chunks
            .iter()
            .zip(similarities)
            .zip(ratings)
            .map(|((chunk, similarity), rating)| ChunkGrade {
                chunk: chunk.clone(),
                similarity: round3(similarity),
                relevance: rating.relevance,
                completeness: rating.completeness,
                faithfulness: rating.faithfulness,
                composite_score: round3(composite(similarity, rating)),
            })
            .collect();

        debug!(count = grades.len(), "Chunks graded");
        Ok(grades)
    }
}
