use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::{ports::VectorIndex, DocumentChunk, DomainError, Embedding, ScoredChunk};

/// Non-durable index with the same generation semantics as the disk
/// backend. Used by tests and local development.
pub struct InMemoryVectorIndex {
    generation: RwLock<Option<Vec<(DocumentChunk, Embedding)>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            generation: RwLock::new(None),
        }
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn add(&self, entries: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError> {
        let mut slot = self
            .generation
            .write()
            .map_err(|e| DomainError::persistence(e.to_string()))?;

        slot.get_or_insert_with(Vec::new).extend_from_slice(entries);
        Ok(())
    }

    async fn query(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredChunk>, DomainError> {
        let slot = self
            .generation
            .read()
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        let chunks = slot.as_ref().ok_or(DomainError::NotInitialized)?;

        let mut results: Vec<ScoredChunk> = chunks
            .iter()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: query.cosine_similarity(embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        Ok(results)
    }

    async fn reset(&self) -> Result<(), DomainError> {
        let mut slot = self
            .generation
            .write()
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_creates_generation_lazily() {
        let index = InMemoryVectorIndex::new();

        let err = index
            .query(&Embedding::new(vec![1.0, 0.0]), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotInitialized));

        index
            .add(&[(
                DocumentChunk::new("test content", Some(1)),
                Embedding::new(vec![1.0, 0.0]),
            )])
            .await
            .unwrap();

        let results = index
            .query(&Embedding::new(vec![1.0, 0.0]), 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn returns_at_most_k_results() {
        let index = InMemoryVectorIndex::new();
        let entries: Vec<_> = (0..5)
            .map(|i| {
                (
                    DocumentChunk::new(format!("chunk {i}"), Some(i + 1)),
                    Embedding::new(vec![1.0, i as f32]),
                )
            })
            .collect();
        index.add(&entries).await.unwrap();

        let results = index
            .query(&Embedding::new(vec![1.0, 0.0]), 3)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
    }
}
