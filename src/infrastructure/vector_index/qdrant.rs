use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ports::VectorIndex, DocumentChunk, DomainError, Embedding, ScoredChunk};

/// Qdrant-backed index. The index generation maps to one collection:
/// created lazily on the first `add`, dropped wholly by `reset`, and
/// reopened implicitly on restart because Qdrant is durable.
///
/// Equal-score ordering is backend-determined here; the disk backend is the
/// one that guarantees insertion-order ties.
pub struct QdrantVectorIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
    // Serializes reset against in-flight add/query.
    ops: RwLock<()>,
}

impl QdrantVectorIndex {
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::persistence(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
            ops: RwLock::new(()),
        })
    }

    async fn collection_exists(&self) -> Result<bool, DomainError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.collection))
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        if self.collection_exists().await? {
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(())
    }

    fn fresh_point_id() -> u64 {
        let bytes = *Uuid::new_v4().as_bytes();
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn add(&self, entries: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError> {
        let _guard = self.ops.read().await;
        self.ensure_collection().await?;

        let mut points = Vec::with_capacity(entries.len());
        for (chunk, embedding) in entries {
            let payload: Payload = serde_json::json!({
                "text": chunk.text,
                "source_page": chunk.source_page,
            })
            .try_into()
            .map_err(|_| DomainError::persistence("failed to build point payload"))?;

            points.push(PointStruct::new(
                Self::fresh_point_id(),
                embedding.as_slice().to_vec(),
                payload,
            ));
        }

        // One upsert call, so a failed ingest commits no partial chunk set.
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(())
    }

    async fn query(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredChunk>, DomainError> {
        let _guard = self.ops.read().await;
        if !self.collection_exists().await? {
            return Err(DomainError::NotInitialized);
        }

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.as_slice().to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                let payload = point.payload;
                let text = payload.get("text")?.as_str()?.to_string();
                let source_page = payload
                    .get("source_page")
                    .and_then(|v| v.as_integer())
                    .map(|p| p as u32);

                Some(ScoredChunk {
                    chunk: DocumentChunk::new(text, source_page),
                    score: point.score,
                })
            })
            .collect())
    }

    async fn reset(&self) -> Result<(), DomainError> {
        let _guard = self.ops.write().await;
        if !self.collection_exists().await? {
            return Ok(());
        }

        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(())
    }
}
