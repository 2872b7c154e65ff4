use async_trait::async_trait;

use crate::domain::{errors::DomainError, DocumentChunk, Embedding, ScoredChunk};

/// Persistent vector index holding at most one live generation.
///
/// The generation is created lazily by the first `add`, destroyed wholly by
/// `reset`, and reopened from durable storage on startup. `reset` is
/// serialized against in-flight `add`/`query` by implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Appends chunks to the current generation in one durable write,
    /// creating the generation if none exists.
    async fn add(&self, entries: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError>;

    /// Returns up to `k` chunks ordered by non-increasing similarity, ties
    /// broken by insertion order. Fails with
    /// [`DomainError::NotInitialized`] when no generation exists.
    async fn query(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredChunk>, DomainError>;

    /// Destroys the current generation. Idempotent.
    async fn reset(&self) -> Result<(), DomainError>;
}
