use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::domain::{errors::DomainError, Prompt};

/// Finite sequence of response fragments. An `Err` item terminates the
/// sequence; the consumer may stop polling at any time.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, DomainError>> + Send>>;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Blocks until the full response text is available.
    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError>;

    /// Produces the response incrementally. Providers without a native
    /// incremental API may emit the whole completion as a single fragment.
    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream, DomainError>;
}
