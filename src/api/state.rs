use std::sync::Arc;

use crate::application::{ChatService, IngestService, SessionManager};
use crate::domain::ports::ConversationStore;
use crate::infrastructure::Config;

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub chat: Arc<ChatService>,
    pub sessions: Arc<SessionManager>,
    pub store: Arc<dyn ConversationStore>,
    pub config: Arc<Config>,
}
