mod conversation_store;
mod embedding;
mod generation;
mod vector_index;

pub use conversation_store::ConversationStore;
pub use embedding::{EmbeddingError, EmbeddingProvider};
pub use generation::{FragmentStream, GenerationProvider};
pub use vector_index::VectorIndex;
