use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doc_chat::api::{create_router, AppState};
use doc_chat::application::{ChatService, IngestService, RetrievalService, SessionManager};
use doc_chat::domain::ports::{
    ConversationStore, EmbeddingProvider, GenerationProvider, VectorIndex,
};
use doc_chat::infrastructure::{
    Config, DiskVectorIndex, InMemoryConversationStore, OpenAiEmbedding, OpenAiGeneration,
    QdrantVectorIndex, RedisConversationStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_chat=debug,api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let index: Arc<dyn VectorIndex> = match config.index.backend.as_str() {
        "qdrant" => {
            let index = QdrantVectorIndex::new(
                &config.index.qdrant_url,
                &config.index.collection,
                config.embedding.dimension,
            )
            .await?;
            info!(url = %config.index.qdrant_url, "using Qdrant vector index");
            Arc::new(index)
        }
        _ => {
            let index = DiskVectorIndex::open(&config.index.data_dir).await?;
            info!(dir = %config.index.data_dir.display(), "using disk vector index");
            Arc::new(index)
        }
    };

    let store: Arc<dyn ConversationStore> = match &config.redis_url {
        Some(url) => {
            info!("using Redis conversation store");
            Arc::new(RedisConversationStore::connect(url)?)
        }
        None => {
            tracing::warn!("REDIS_URL not set, conversations will not survive restarts");
            Arc::new(InMemoryConversationStore::new())
        }
    };

    let embedding: Arc<dyn EmbeddingProvider> =
        Arc::new(OpenAiEmbedding::from_config(&config.embedding));
    let generation: Arc<dyn GenerationProvider> =
        Arc::new(OpenAiGeneration::from_config(&config.llm));

    let retrieval = Arc::new(RetrievalService::new(
        embedding.clone(),
        index.clone(),
        config.retrieval.top_k,
    ));
    let ingest = Arc::new(IngestService::new(
        embedding,
        index,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    ));
    let sessions = Arc::new(SessionManager::new(store.clone()));
    let chat = Arc::new(ChatService::new(
        generation,
        retrieval,
        store.clone(),
        sessions.clone(),
        config.chat.policy(),
    ));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let state = AppState {
        ingest,
        chat,
        sessions,
        store,
        config: Arc::new(config),
    };
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
