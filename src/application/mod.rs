//! Application layer - use cases and orchestration.
//!
//! Services here orchestrate domain logic through the domain ports (traits)
//! and never depend on concrete infrastructure.

pub mod services;

pub use services::{
    ChatPolicy, ChatService, IngestService, RetrievalService, RetrievedChunk, SessionManager,
    STREAM_ERROR_MARKER,
};
