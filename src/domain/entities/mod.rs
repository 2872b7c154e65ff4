mod conversation;
mod document;
mod embedding;
mod prompt;

pub use conversation::{Conversation, Message, MessageRole};
pub use document::{split_pages, ChunkCandidate, DocumentChunk, PageText, ScoredChunk};
pub use embedding::Embedding;
pub use prompt::Prompt;
