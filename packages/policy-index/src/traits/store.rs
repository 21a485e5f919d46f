//! Vector storage for policy chunks.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EmbeddedChunk, MetadataFilter, ScoredChunk};

/// Embedding-indexed chunk storage.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert chunks. Re-adding a chunk with the same id replaces it.
    async fn add_chunks(&self, chunks: &[EmbeddedChunk]) -> Result<()>;

    /// The `k` chunks closest to `embedding`, best first.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Like [`similarity_search`](Self::similarity_search), returning the stored vectors too.
    async fn similarity_search_with_vectors(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<(ScoredChunk, Vec<f32>)>>;

    /// `k` relevant but mutually diverse chunks.
    ///
    /// Fetches `fetch_k` candidates by similarity and re-ranks them with
    /// [`maximal_marginal_relevance`]. `lambda` = 1 is pure relevance, 0 pure diversity.
    async fn max_marginal_relevance_search(
        &self,
        embedding: &[f32],
        k: usize,
        fetch_k: usize,
        lambda: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let candidates = self
            .similarity_search_with_vectors(embedding, fetch_k.max(k), filter)
            .await?;
        let vectors: Vec<Vec<f32>> = candidates.iter().map(|(_, v)| v.clone()).collect();
        let picked = maximal_marginal_relevance(embedding, &vectors, k, lambda);

        let mut slots: Vec<Option<ScoredChunk>> =
            candidates.into_iter().map(|(c, _)| Some(c)).collect();
        Ok(picked.into_iter().filter_map(|i| slots[i].take()).collect())
    }

    /// Replace everything stored for a site with `chunks`.
    async fn replace_site(&self, site_url: &str, chunks: &[EmbeddedChunk]) -> Result<()> {
        self.delete_site(site_url).await?;
        self.add_chunks(chunks).await
    }

    /// Remove every chunk of a site. Returns how many were removed.
    async fn delete_site(&self, site_url: &str) -> Result<usize>;

    /// Number of stored chunks matching the filter.
    async fn count(&self, filter: Option<&MetadataFilter>) -> Result<usize>;
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Greedy maximal marginal relevance selection.
///
/// Returns indices into `candidates`, in selection order. Each step picks the
/// candidate maximizing `lambda * sim(query, d) - (1 - lambda) * max sim(d, selected)`.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    lambda: f32,
) -> Vec<usize> {
    let k = k.min(candidates.len());
    if k == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut selected: Vec<usize> = Vec::with_capacity(k);
    while selected.len() < k {
        let best = (0..candidates.len())
            .filter(|i| !selected.contains(i))
            .map(|i| {
                let redundancy = selected
                    .iter()
                    .map(|&j| cosine_similarity(&candidates[i], &candidates[j]))
                    .fold(f32::NEG_INFINITY, f32::max);
                let redundancy = if selected.is_empty() { 0.0 } else { redundancy };
                (i, lambda * relevance[i] - (1.0 - lambda) * redundancy)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((i, _)) => selected.push(i),
            None => break,
        }
    }

    selected
}
