//! In-memory chunk store for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::traits::store::{cosine_similarity, ChunkStore};
use crate::types::{EmbeddedChunk, MetadataFilter, PolicyChunk, ScoredChunk};

/// Chunks and their vectors, keyed by chunk id.
///
/// Search is a linear scan. Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    chunks: RwLock<HashMap<String, (PolicyChunk, Vec<f32>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, (PolicyChunk, Vec<f32>)>> {
        self.chunks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, (PolicyChunk, Vec<f32>)>> {
        self.chunks.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All stored chunks of one site.
    pub fn chunks_for_site(&self, site_url: &str) -> Vec<PolicyChunk> {
        self.read()
            .values()
            .filter(|(chunk, _)| chunk.site_url == site_url)
            .map(|(chunk, _)| chunk.clone())
            .collect()
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn add_chunks(&self, chunks: &[EmbeddedChunk]) -> Result<()> {
        let mut stored = self.write();
        for embedded in chunks {
            stored.insert(
                embedded.chunk.id.clone(),
                (embedded.chunk.clone(), embedded.embedding.clone()),
            );
        }
        Ok(())
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        Ok(self
            .similarity_search_with_vectors(embedding, k, filter)
            .await?
            .into_iter()
            .map(|(chunk, _)| chunk)
            .collect())
    }

    async fn similarity_search_with_vectors(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<(ScoredChunk, Vec<f32>)>> {
        let stored = self.read();
        let mut scored: Vec<(ScoredChunk, Vec<f32>)> = stored
            .values()
            .filter(|(chunk, _)| filter.map_or(true, |f| f.matches(&chunk.metadata)))
            .map(|(chunk, vector)| {
                let hit = ScoredChunk {
                    chunk: chunk.clone(),
                    score: cosine_similarity(embedding, vector),
                };
                (hit, vector.clone())
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.score
                .partial_cmp(&a.0.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.chunk.id.cmp(&b.0.chunk.id))
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn delete_site(&self, site_url: &str) -> Result<usize> {
        let mut stored = self.write();
        let before = stored.len();
        stored.retain(|_, (chunk, _)| chunk.site_url != site_url);
        Ok(before - stored.len())
    }

    async fn count(&self, filter: Option<&MetadataFilter>) -> Result<usize> {
        Ok(self
            .read()
            .values()
            .filter(|(chunk, _)| filter.map_or(true, |f| f.matches(&chunk.metadata)))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{chunk_id, ChunkMetadata};

    fn embedded(site: &str, content: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        let source = format!("{}privacy", site);
        EmbeddedChunk {
            chunk: PolicyChunk {
                id: chunk_id(site, &source, 0, content),
                site_url: site.to_string(),
                content: content.to_string(),
                metadata: ChunkMetadata::new(source, site),
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn test_similarity_search_orders_by_score() {
        let store = MemoryStore::new();
        store
            .add_chunks(&[
                embedded("https://a.com/", "cookies", vec![0.0, 1.0]),
                embedded("https://a.com/", "sharing", vec![1.0, 0.1]),
            ])
            .await
            .unwrap();

        let hits = store.similarity_search(&[1.0, 0.0], 5, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.content, "sharing");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_filter_by_domain() {
        let store = MemoryStore::new();
        store
            .add_chunks(&[
                embedded("https://a.com/", "a policy", vec![1.0, 0.0]),
                embedded("https://b.com/", "b policy", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let filter = MetadataFilter::for_domain("https://b.com/");
        let hits = store.similarity_search(&[1.0, 0.0], 5, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.content, "b policy");
        assert_eq!(store.count(Some(&filter)).await.unwrap(), 1);
        assert_eq!(store.count(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_re_adding_is_idempotent() {
        let store = MemoryStore::new();
        let chunk = embedded("https://a.com/", "same", vec![1.0]);
        store.add_chunks(&[chunk.clone()]).await.unwrap();
        store.add_chunks(&[chunk]).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_site() {
        let store = MemoryStore::new();
        store
            .add_chunks(&[
                embedded("https://a.com/", "old", vec![1.0]),
                embedded("https://b.com/", "other", vec![1.0]),
            ])
            .await
            .unwrap();

        store
            .replace_site("https://a.com/", &[embedded("https://a.com/", "new", vec![1.0])])
            .await
            .unwrap();

        let contents: Vec<String> = store
            .chunks_for_site("https://a.com/")
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["new"]);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_mmr_search_returns_diverse_chunks() {
        let store = MemoryStore::new();
        store
            .add_chunks(&[
                embedded("https://a.com/", "first", vec![1.0, 0.9, 0.0]),
                embedded("https://a.com/", "duplicate", vec![1.0, 0.91, 0.0]),
                embedded("https://a.com/", "different", vec![0.6, 1.0, 0.3]),
            ])
            .await
            .unwrap();

        let hits = store
            .max_marginal_relevance_search(&[1.0, 1.0, 0.0], 2, 20, 0.5, None)
            .await
            .unwrap();
        let contents: Vec<&str> = hits.iter().map(|h| h.chunk.content.as_str()).collect();
        assert_eq!(contents, vec!["duplicate", "different"]);
    }

    #[tokio::test]
    async fn test_delete_site_counts() {
        let store = MemoryStore::new();
        store
            .add_chunks(&[
                embedded("https://a.com/", "one", vec![1.0]),
                embedded("https://a.com/", "two", vec![1.0]),
            ])
            .await
            .unwrap();
        assert_eq!(store.delete_site("https://a.com/").await.unwrap(), 2);
        assert!(store.is_empty());
    }
}
