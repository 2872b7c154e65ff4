mod chat;
mod ingest;
mod retrieval;
mod session;

pub use chat::{ChatPolicy, ChatService, STREAM_ERROR_MARKER};
pub use ingest::IngestService;
pub use retrieval::{RetrievalService, RetrievedChunk};
pub use session::{SessionHandle, SessionManager};
