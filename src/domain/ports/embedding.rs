use async_trait::async_trait;

use crate::domain::Embedding;

/// Raw embedding failure. Callers classify it: ingest wraps it as an
/// indexing error, a chat turn as a generation provider error.
#[derive(Debug, thiserror::Error)]
#[error("embedding failed: {0}")]
pub struct EmbeddingError(pub String);

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError>;
    fn dimension(&self) -> usize;
}
