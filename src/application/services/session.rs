use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{ports::ConversationStore, DomainError, Message};

/// Transient in-process bookkeeping for a session. The persisted
/// conversation is the source of truth; the handle only tracks liveness.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl SessionHandle {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_active: now,
        }
    }
}

/// Coordinates transient session handles with persisted conversations.
///
/// The handle cache is an explicit map owned by the manager; rename and
/// delete run inside one lock acquisition so no request observes a
/// half-renamed session.
pub struct SessionManager {
    store: Arc<dyn ConversationStore>,
    handles: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an empty persisted conversation under a fresh random id.
    #[instrument(skip(self))]
    pub async fn create(&self) -> Result<String, DomainError> {
        let session_id = Uuid::new_v4().to_string();
        self.store.create(&session_id).await?;
        self.handles
            .lock()
            .await
            .insert(session_id.clone(), SessionHandle::new());
        Ok(session_id)
    }

    /// Repoints a conversation key, migrating any live handle. The target
    /// is pre-checked so a conflicting rename leaves the original session
    /// fully intact.
    #[instrument(skip(self))]
    pub async fn rename(&self, old_id: &str, new_id: &str) -> Result<(), DomainError> {
        let mut handles = self.handles.lock().await;

        if self.store.exists(new_id).await? {
            return Err(DomainError::conflict(format!(
                "session {new_id} already exists"
            )));
        }
        self.store.rename(old_id, new_id).await?;

        if let Some(handle) = handles.remove(old_id) {
            handles.insert(new_id.to_string(), handle);
        }
        Ok(())
    }

    /// Removes the handle and the persisted conversation. Returns whether a
    /// persisted conversation existed.
    #[instrument(skip(self))]
    pub async fn delete(&self, session_id: &str) -> Result<bool, DomainError> {
        let mut handles = self.handles.lock().await;
        handles.remove(session_id);
        self.store.delete(session_id).await
    }

    pub async fn list(&self) -> Result<Vec<String>, DomainError> {
        self.store.list().await
    }

    /// Persisted history for a session, dangling turns included.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Message>, DomainError> {
        self.store
            .get(session_id)
            .await?
            .map(|c| c.messages)
            .ok_or_else(|| DomainError::not_found(format!("session {session_id}")))
    }

    /// Marks a session as active for the current turn, creating a handle if
    /// the session was started before this process.
    pub async fn touch(&self, session_id: &str) {
        let mut handles = self.handles.lock().await;
        handles
            .entry(session_id.to_string())
            .and_modify(|h| h.last_active = Utc::now())
            .or_insert_with(SessionHandle::new);
    }
}
