use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::{ports::VectorIndex, DocumentChunk, DomainError, Embedding, ScoredChunk};

const GENERATION_FILE: &str = "generation.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Generation {
    chunks: Vec<StoredChunk>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredChunk {
    chunk: DocumentChunk,
    embedding: Embedding,
}

/// File-backed vector index. The whole generation lives in one JSON file
/// replaced atomically on every write, so a restart reopens exactly what the
/// last completed `add` left behind.
///
/// The RwLock over the generation slot serializes `reset` against in-flight
/// `add` and `query`.
pub struct DiskVectorIndex {
    path: PathBuf,
    generation: RwLock<Option<Generation>>,
}

impl DiskVectorIndex {
    /// Opens the index directory, reloading a persisted generation when one
    /// exists. Corrupt or partial on-disk state logs a warning and starts
    /// in the "no generation" state instead of failing startup.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DomainError::persistence(format!("create {}: {e}", dir.display())))?;

        let path = dir.join(GENERATION_FILE);
        let generation = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Generation>(&bytes) {
                Ok(generation) => {
                    tracing::info!(chunks = generation.chunks.len(), "reopened index generation");
                    Some(generation)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "corrupt index generation, starting empty");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable index generation, starting empty");
                None
            }
        };

        Ok(Self {
            path,
            generation: RwLock::new(generation),
        })
    }

    async fn persist(&self, generation: &Generation) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec(generation)
            .map_err(|e| DomainError::persistence(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))
    }
}

#[async_trait]
impl VectorIndex for DiskVectorIndex {
    async fn add(&self, entries: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError> {
        let mut slot = self.generation.write().await;
        let created = slot.is_none();
        let generation = slot.get_or_insert_with(Generation::default);

        let before = generation.chunks.len();
        generation
            .chunks
            .extend(entries.iter().map(|(chunk, embedding)| StoredChunk {
                chunk: chunk.clone(),
                embedding: embedding.clone(),
            }));

        if let Err(e) = self.persist(generation).await {
            // A failed write must not leave chunks visible that never
            // reached disk.
            generation.chunks.truncate(before);
            if created {
                *slot = None;
            }
            return Err(e);
        }
        Ok(())
    }

    async fn query(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredChunk>, DomainError> {
        let slot = self.generation.read().await;
        let generation = slot.as_ref().ok_or(DomainError::NotInitialized)?;

        let mut results: Vec<ScoredChunk> = generation
            .chunks
            .iter()
            .map(|stored| ScoredChunk {
                chunk: stored.chunk.clone(),
                score: query.cosine_similarity(&stored.embedding),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        Ok(results)
    }

    async fn reset(&self) -> Result<(), DomainError> {
        let mut slot = self.generation.write().await;
        *slot = None;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::persistence(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, page: u32, vector: Vec<f32>) -> (DocumentChunk, Embedding) {
        (
            DocumentChunk::new(text, Some(page)),
            Embedding::new(vector),
        )
    }

    #[tokio::test]
    async fn add_then_query_ranks_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let index = DiskVectorIndex::open(dir.path()).await.unwrap();

        index
            .add(&[
                entry("far", 1, vec![0.0, 1.0, 0.0]),
                entry("near", 2, vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = index
            .query(&Embedding::new(vec![1.0, 0.0, 0.0]), 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "near");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn query_is_deterministic_and_breaks_ties_by_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let index = DiskVectorIndex::open(dir.path()).await.unwrap();

        index
            .add(&[
                entry("first", 1, vec![1.0, 0.0]),
                entry("second", 2, vec![1.0, 0.0]),
                entry("third", 3, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0]);
        let a = index.query(&query, 2).await.unwrap();
        let b = index.query(&query, 2).await.unwrap();

        assert_eq!(a.len(), 2);
        assert_eq!(a[0].chunk.text, "first");
        assert_eq!(a[1].chunk.text, "second");
        assert_eq!(
            a.iter().map(|r| r.chunk.text.clone()).collect::<Vec<_>>(),
            b.iter().map(|r| r.chunk.text.clone()).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn query_without_generation_is_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let index = DiskVectorIndex::open(dir.path()).await.unwrap();

        let err = index
            .query(&Embedding::new(vec![1.0]), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotInitialized));
    }

    #[tokio::test]
    async fn reset_destroys_the_generation_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let index = DiskVectorIndex::open(dir.path()).await.unwrap();

        index
            .add(&[entry("chunk", 1, vec![1.0, 0.0])])
            .await
            .unwrap();

        index.reset().await.unwrap();
        index.reset().await.unwrap();

        let err = index
            .query(&Embedding::new(vec![1.0, 0.0]), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotInitialized));
    }

    #[tokio::test]
    async fn generation_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let index = DiskVectorIndex::open(dir.path()).await.unwrap();
            index
                .add(&[entry("persisted", 3, vec![0.5, 0.5])])
                .await
                .unwrap();
        }

        let reopened = DiskVectorIndex::open(dir.path()).await.unwrap();
        let results = reopened
            .query(&Embedding::new(vec![0.5, 0.5]), 1)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "persisted");
        assert_eq!(results[0].chunk.source_page, Some(3));
    }

    #[tokio::test]
    async fn corrupt_generation_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(GENERATION_FILE), b"{not json").unwrap();

        let index = DiskVectorIndex::open(dir.path()).await.unwrap();
        let err = index
            .query(&Embedding::new(vec![1.0]), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotInitialized));
    }
}
