use std::sync::Arc;

use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingProvider, VectorIndex},
    DomainError, ScoredChunk,
};

/// One retrieved chunk formatted for prompt assembly: text plus a
/// human-readable citation derived from the source page.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub source_page: Option<u32>,
}

impl RetrievedChunk {
    pub fn citation(&self) -> String {
        match self.source_page {
            Some(page) => format!("(Source: page {page})"),
            None => "(Source: page unknown)".to_string(),
        }
    }
}

impl From<ScoredChunk> for RetrievedChunk {
    fn from(result: ScoredChunk) -> Self {
        Self {
            text: result.chunk.text,
            source_page: result.chunk.source_page,
        }
    }
}

/// Fetches the top-k chunks relevant to a query. Retrieval is optional
/// context: an index with no generation yields an empty result, not an
/// error.
pub struct RetrievalService {
    embedding: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    default_top_k: usize,
}

impl RetrievalService {
    pub fn new(
        embedding: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedding,
            index,
            default_top_k,
        }
    }

    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, DomainError> {
        self.retrieve_top_k(query, self.default_top_k).await
    }

    #[instrument(skip(self))]
    pub async fn retrieve_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, DomainError> {
        let embedding = self
            .embedding
            .embed(query)
            .await
            .map_err(|e| DomainError::generation(e.to_string()))?;

        match self.index.query(&embedding, top_k).await {
            Ok(results) => Ok(results.into_iter().map(RetrievedChunk::from).collect()),
            Err(DomainError::NotInitialized) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
