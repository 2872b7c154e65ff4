pub mod config;
pub mod conversation_store;
pub mod embedding;
pub mod generation;
pub mod pdf;
pub mod vector_index;

pub use config::Config;
pub use conversation_store::{InMemoryConversationStore, RedisConversationStore};
pub use embedding::OpenAiEmbedding;
pub use generation::OpenAiGeneration;
pub use vector_index::{DiskVectorIndex, InMemoryVectorIndex, QdrantVectorIndex};
