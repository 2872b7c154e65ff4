use async_trait::async_trait;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::openai;

use crate::domain::ports::{EmbeddingError, EmbeddingProvider};
use crate::domain::Embedding;
use crate::infrastructure::config::EmbeddingConfig;

/// OpenAI text embeddings via rig. Reads `OPENAI_API_KEY` from the
/// environment.
pub struct OpenAiEmbedding {
    model: String,
    dimension: usize,
}

impl OpenAiEmbedding {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(&config.model, config.dimension)
    }
}

impl Default for OpenAiEmbedding {
    fn default() -> Self {
        Self::new("text-embedding-3-small", 1536)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let client = openai::Client::from_env();
        let model = client.embedding_model(&self.model);

        let embeddings = EmbeddingsBuilder::new(model)
            .document(text)
            .map_err(|e| EmbeddingError(e.to_string()))?
            .build()
            .await
            .map_err(|e| EmbeddingError(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .map(|(_doc, emb)| {
                let vec: Vec<f32> = emb.first().vec.into_iter().map(|x| x as f32).collect();
                Embedding::new(vec)
            })
            .ok_or_else(|| EmbeddingError("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let client = openai::Client::from_env();
        let model = client.embedding_model(&self.model);

        let mut builder = EmbeddingsBuilder::new(model);
        for text in texts {
            builder = builder
                .document(*text)
                .map_err(|e| EmbeddingError(e.to_string()))?;
        }

        let embeddings = builder
            .build()
            .await
            .map_err(|e| EmbeddingError(e.to_string()))?;

        Ok(embeddings
            .into_iter()
            .map(|(_doc, emb)| {
                let vec: Vec<f32> = emb.first().vec.into_iter().map(|x| x as f32).collect();
                Embedding::new(vec)
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
