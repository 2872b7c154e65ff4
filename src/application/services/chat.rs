use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::instrument;

use crate::application::services::retrieval::{RetrievalService, RetrievedChunk};
use crate::application::services::session::SessionManager;
use crate::domain::{
    ports::{ConversationStore, GenerationProvider},
    DomainError, Message, Prompt,
};

/// Marker prefixed to the final fragment when the generation provider fails
/// mid-stream. Errors never raise past the streaming boundary.
pub const STREAM_ERROR_MARKER: &str = "[error]";

/// Consumer-driven backpressure: the producer suspends once this many
/// fragments are unconsumed.
const FRAGMENT_BUFFER: usize = 8;

/// Fixed response policy folded into the system instructions.
#[derive(Debug, Clone)]
pub struct ChatPolicy {
    pub domain_name: String,
    pub refusal_sentence: String,
    pub insufficient_sentence: String,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            domain_name: "the indexed documents".to_string(),
            refusal_sentence: "I can only answer questions about the indexed documents."
                .to_string(),
            insufficient_sentence:
                "The indexed documents do not contain enough information to answer that question."
                    .to_string(),
        }
    }
}

impl ChatPolicy {
    fn render_system(&self, context: &[RetrievedChunk]) -> String {
        let mut system = format!(
            "You are an assistant that answers questions about {domain}.\n\
             Answer only questions relevant to {domain}. If the question is \
             off-topic, reply with exactly this sentence: \"{refusal}\"\n\
             If the question is on-topic but the context below does not \
             support an answer, reply with exactly this sentence: \
             \"{insufficient}\"\n\
             Never invent content that is not in the supplied context. Every \
             factual claim taken from the context must carry its citation in \
             the form (Source: page N), most relevant source first.",
            domain = self.domain_name,
            refusal = self.refusal_sentence,
            insufficient = self.insufficient_sentence,
        );

        if !context.is_empty() {
            system.push_str("\n\nContext:\n");
            for chunk in context {
                system.push_str(&chunk.text);
                system.push('\n');
                system.push_str(&chunk.citation());
                system.push_str("\n\n");
            }
        }

        system
    }
}

/// Composes system instructions, retrieved context, persisted history and
/// the new user turn into one generation request, then persists the
/// completed turn.
pub struct ChatService {
    generation: Arc<dyn GenerationProvider>,
    retrieval: Arc<RetrievalService>,
    store: Arc<dyn ConversationStore>,
    sessions: Arc<SessionManager>,
    policy: ChatPolicy,
}

impl ChatService {
    pub fn new(
        generation: Arc<dyn GenerationProvider>,
        retrieval: Arc<RetrievalService>,
        store: Arc<dyn ConversationStore>,
        sessions: Arc<SessionManager>,
        policy: ChatPolicy,
    ) -> Self {
        Self {
            generation,
            retrieval,
            store,
            sessions,
            policy,
        }
    }

    /// Shared composition step for both entry points. The working history is
    /// rebuilt from the persisted conversation on every turn; an unknown
    /// session starts from empty history.
    async fn assemble(
        &self,
        session_id: &str,
        message: &str,
        use_retrieval: bool,
    ) -> Result<Prompt, DomainError> {
        let context = if use_retrieval {
            self.retrieval.retrieve(message).await?
        } else {
            Vec::new()
        };

        let mut turns = self
            .store
            .get(session_id)
            .await?
            .map(|c| c.messages)
            .unwrap_or_default();
        turns.push(Message::user(message));

        Ok(Prompt::new(self.policy.render_system(&context), turns))
    }

    /// Atomic entry point: blocks until the full response is available.
    ///
    /// Both messages are persisted only after the provider completes, user
    /// message first; a cancelled call persists nothing.
    #[instrument(skip(self, message))]
    pub async fn generate(
        &self,
        session_id: &str,
        message: &str,
        use_retrieval: bool,
    ) -> Result<String, DomainError> {
        self.sessions.touch(session_id).await;

        let prompt = self.assemble(session_id, message, use_retrieval).await?;
        let response = self.generation.complete(&prompt).await?;

        self.store
            .append_message(session_id, &Message::user(message))
            .await?;
        self.store
            .append_message(session_id, &Message::assistant(&response))
            .await?;

        Ok(response)
    }

    /// Streaming entry point: always retrieves context. The returned
    /// sequence is finite and not restartable; dropping it stops fragment
    /// production.
    ///
    /// The user message is persisted before the provider is called, so an
    /// unreachable store aborts the turn up front. The assistant message is
    /// persisted only when the stream runs to completion — a cancelled or
    /// failed stream leaves a dangling user turn, which `history` reports
    /// faithfully.
    #[instrument(skip(self, message))]
    pub async fn stream(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ReceiverStream<String>, DomainError> {
        self.sessions.touch(session_id).await;

        let prompt = self.assemble(session_id, message, true).await?;
        self.store
            .append_message(session_id, &Message::user(message))
            .await?;

        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let generation = Arc::clone(&self.generation);
        let store = Arc::clone(&self.store);
        let session_id = session_id.to_string();

        tokio::spawn(async move {
            let mut fragments = match generation.stream(&prompt).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    let _ = tx.send(format!("{STREAM_ERROR_MARKER} {e}")).await;
                    return;
                }
            };

            let mut full = String::new();
            while let Some(item) = fragments.next().await {
                match item {
                    Ok(fragment) => {
                        full.push_str(&fragment);
                        if tx.send(fragment).await.is_err() {
                            // Receiver dropped: the consumer cancelled.
                            // The partial assistant message is discarded.
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(format!("{STREAM_ERROR_MARKER} {e}")).await;
                        return;
                    }
                }
            }

            if let Err(e) = store
                .append_message(&session_id, &Message::assistant(&full))
                .await
            {
                tracing::error!(error = %e, session_id, "failed to persist assistant message");
            }
        });

        Ok(ReceiverStream::new(rx))
    }
}
