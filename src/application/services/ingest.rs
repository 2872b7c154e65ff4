use std::sync::Arc;

use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingProvider, VectorIndex},
    split_pages, DomainError, PageText,
};

/// Turns extracted document pages into indexed chunks.
///
/// Ingestion is all-or-nothing: chunking and embedding happen before any
/// index mutation, and all chunks land in a single `add`. When
/// `clear_existing` is requested the reset is deferred until the new chunk
/// set is ready, so a failed upload leaves the index unmodified.
pub struct IngestService {
    embedding: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl IngestService {
    pub fn new(
        embedding: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            embedding,
            index,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Indexes document pages, returning the number of chunks written.
    #[instrument(skip(self, pages), fields(pages = pages.len()))]
    pub async fn index_pages(
        &self,
        pages: &[PageText],
        clear_existing: bool,
    ) -> Result<usize, DomainError> {
        let candidates = split_pages(pages, self.chunk_size, self.chunk_overlap);

        if candidates.is_empty() {
            if clear_existing {
                self.index.reset().await?;
            }
            return Ok(0);
        }

        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self
            .embedding
            .embed_batch(&texts)
            .await
            .map_err(|e| DomainError::indexing(e.to_string()))?;

        if embeddings.len() != candidates.len() {
            return Err(DomainError::indexing(format!(
                "embedding count mismatch: {} chunks, {} embeddings",
                candidates.len(),
                embeddings.len()
            )));
        }

        let entries: Vec<_> = candidates
            .into_iter()
            .map(|c| c.into_chunk())
            .zip(embeddings)
            .collect();

        if clear_existing {
            self.index.reset().await?;
        }
        self.index.add(&entries).await?;

        tracing::info!(chunks = entries.len(), "document indexed");
        Ok(entries.len())
    }

    /// Wipes the vector index. Idempotent.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), DomainError> {
        self.index.reset().await
    }
}
