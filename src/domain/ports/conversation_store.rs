use async_trait::async_trait;

use crate::domain::{errors::DomainError, Conversation, Message};

/// Durable, session-keyed append-only message log.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Creates an empty conversation for `session_id`.
    async fn create(&self, session_id: &str) -> Result<(), DomainError>;

    /// Appends one message, creating the conversation if it does not exist.
    /// Each append is independently atomic.
    async fn append_message(&self, session_id: &str, message: &Message)
        -> Result<(), DomainError>;

    /// Full conversation for `session_id`, or `None` if unknown.
    async fn get(&self, session_id: &str) -> Result<Option<Conversation>, DomainError>;

    async fn exists(&self, session_id: &str) -> Result<bool, DomainError>;

    /// Repoints the conversation key. Fails with `NotFound` when `old_id`
    /// is unknown and `Conflict` when `new_id` already exists; a failed
    /// rename leaves the original conversation untouched.
    async fn rename(&self, old_id: &str, new_id: &str) -> Result<(), DomainError>;

    /// Removes the conversation and all its messages irrecoverably.
    /// Returns whether a conversation existed.
    async fn delete(&self, session_id: &str) -> Result<bool, DomainError>;

    /// All known session identifiers, in no particular order.
    async fn list(&self) -> Result<Vec<String>, DomainError>;
}
