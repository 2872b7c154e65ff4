use thiserror::Error;

/// Failure taxonomy for the whole core. Provider- and storage-level errors
/// are wrapped into one of these at the component boundary and never leak
/// through as raw client errors.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Retrieval attempted while no index generation exists. Recovered
    /// locally by returning empty context; never surfaced to the caller.
    #[error("vector index not initialized")]
    NotInitialized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Document parsing, chunking or embedding failed during upload. The
    /// index is left unmodified.
    #[error("indexing failed: {0}")]
    Indexing(String),

    #[error("generation provider error: {0}")]
    GenerationProvider(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn indexing(msg: impl Into<String>) -> Self {
        Self::Indexing(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::GenerationProvider(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
