use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{ports::ConversationStore, Conversation, DomainError, Message};

/// Non-durable conversation store with the same key semantics as the Redis
/// backend. Used by tests and local development.
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create(&self, session_id: &str) -> Result<(), DomainError> {
        let mut conversations = self
            .conversations
            .write()
            .map_err(|e| DomainError::persistence(e.to_string()))?;

        if conversations.contains_key(session_id) {
            return Err(DomainError::conflict(format!(
                "session {session_id} already exists"
            )));
        }
        conversations.insert(session_id.to_string(), Conversation::new(session_id));
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &str,
        message: &Message,
    ) -> Result<(), DomainError> {
        let mut conversations = self
            .conversations
            .write()
            .map_err(|e| DomainError::persistence(e.to_string()))?;

        conversations
            .entry(session_id.to_string())
            .or_insert_with(|| Conversation::new(session_id))
            .push(message.clone());
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<Conversation>, DomainError> {
        let conversations = self
            .conversations
            .read()
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(conversations.get(session_id).cloned())
    }

    async fn exists(&self, session_id: &str) -> Result<bool, DomainError> {
        let conversations = self
            .conversations
            .read()
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(conversations.contains_key(session_id))
    }

    async fn rename(&self, old_id: &str, new_id: &str) -> Result<(), DomainError> {
        let mut conversations = self
            .conversations
            .write()
            .map_err(|e| DomainError::persistence(e.to_string()))?;

        if conversations.contains_key(new_id) {
            return Err(DomainError::conflict(format!(
                "session {new_id} already exists"
            )));
        }
        let mut conversation = conversations
            .remove(old_id)
            .ok_or_else(|| DomainError::not_found(format!("session {old_id}")))?;
        conversation.session_id = new_id.to_string();
        conversations.insert(new_id.to_string(), conversation);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool, DomainError> {
        let mut conversations = self
            .conversations
            .write()
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(conversations.remove(session_id).is_some())
    }

    async fn list(&self) -> Result<Vec<String>, DomainError> {
        let conversations = self
            .conversations
            .read()
            .map_err(|e| DomainError::persistence(e.to_string()))?;
        Ok(conversations.keys().cloned().collect())
    }
}
