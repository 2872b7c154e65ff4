use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::application::ChatPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub chunking: ChunkingConfig,
    pub chat: ChatConfig,
    pub index: IndexConfig,
    /// When unset the conversation store falls back to a non-durable
    /// in-memory map (local development only).
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub domain_name: String,
    pub refusal_sentence: String,
    pub insufficient_sentence: String,
}

impl ChatConfig {
    pub fn policy(&self) -> ChatPolicy {
        ChatPolicy {
            domain_name: self.domain_name.clone(),
            refusal_sentence: self.refusal_sentence.clone(),
            insufficient_sentence: self.insufficient_sentence.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// "disk" (default) or "qdrant".
    pub backend: String,
    pub data_dir: PathBuf,
    pub qdrant_url: String,
    pub collection: String,
}

impl Default for Config {
    fn default() -> Self {
        let policy = ChatPolicy::default();
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            llm: LlmConfig {
                model: "gpt-4o-mini".to_string(),
                timeout_seconds: 60,
            },
            embedding: EmbeddingConfig {
                model: "text-embedding-3-small".to_string(),
                dimension: 1536,
            },
            retrieval: RetrievalConfig { top_k: 4 },
            chunking: ChunkingConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
            },
            chat: ChatConfig {
                domain_name: policy.domain_name,
                refusal_sentence: policy.refusal_sentence,
                insufficient_sentence: policy.insufficient_sentence,
            },
            index: IndexConfig {
                backend: "disk".to_string(),
                data_dir: PathBuf::from("./data/vectorstore"),
                qdrant_url: "http://localhost:6334".to_string(),
                collection: "doc_chunks".to_string(),
            },
            redis_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                host: env_or("SERVER_HOST", defaults.server.host),
                port: env_or("SERVER_PORT", defaults.server.port),
            },
            llm: LlmConfig {
                model: env_or("LLM_MODEL", defaults.llm.model),
                timeout_seconds: env_or("LLM_TIMEOUT_SECONDS", defaults.llm.timeout_seconds),
            },
            embedding: EmbeddingConfig {
                model: env_or("EMBEDDING_MODEL", defaults.embedding.model),
                dimension: env_or("EMBEDDING_DIMENSION", defaults.embedding.dimension),
            },
            retrieval: RetrievalConfig {
                top_k: env_or("RETRIEVAL_TOP_K", defaults.retrieval.top_k),
            },
            chunking: ChunkingConfig {
                chunk_size: env_or("CHUNK_SIZE", defaults.chunking.chunk_size),
                chunk_overlap: env_or("CHUNK_OVERLAP", defaults.chunking.chunk_overlap),
            },
            chat: ChatConfig {
                domain_name: env_or("CHAT_DOMAIN", defaults.chat.domain_name),
                refusal_sentence: env_or("CHAT_REFUSAL_SENTENCE", defaults.chat.refusal_sentence),
                insufficient_sentence: env_or(
                    "CHAT_INSUFFICIENT_SENTENCE",
                    defaults.chat.insufficient_sentence,
                ),
            },
            index: IndexConfig {
                backend: env_or("INDEX_BACKEND", defaults.index.backend),
                data_dir: env_or("INDEX_DATA_DIR", defaults.index.data_dir),
                qdrant_url: env_or("QDRANT_URL", defaults.index.qdrant_url),
                collection: env_or("QDRANT_COLLECTION", defaults.index.collection),
            },
            redis_url: std::env::var("REDIS_URL").ok(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
