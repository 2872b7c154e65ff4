//! End-to-end flows over the application services with scripted providers:
//! prompt assembly, retrieval grounding, persistence ordering for atomic and
//! streamed turns, and session lifecycle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use doc_chat::application::{
    ChatPolicy, ChatService, IngestService, RetrievalService, SessionManager, STREAM_ERROR_MARKER,
};
use doc_chat::domain::ports::{
    ConversationStore, EmbeddingError, EmbeddingProvider, FragmentStream, GenerationProvider,
    VectorIndex,
};
use doc_chat::domain::{DomainError, Embedding, MessageRole, PageText, Prompt};
use doc_chat::infrastructure::{InMemoryConversationStore, InMemoryVectorIndex};

const DIMENSION: usize = 64;

/// Deterministic bag-of-words embedding: texts sharing vocabulary come out
/// similar, disjoint texts near-orthogonal. Good enough to exercise ranking.
struct BagOfWordsEmbedding;

fn bag_of_words(text: &str) -> Embedding {
    let mut buckets = vec![0.0f32; DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let lower = word.to_lowercase();
        let bucket = lower.bytes().map(|b| b as usize).sum::<usize>() % DIMENSION;
        buckets[bucket] += 1.0;
    }
    Embedding::new(buckets)
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        Ok(bag_of_words(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

/// What the scripted provider does when `stream` is called.
#[derive(Clone)]
enum StreamScript {
    Fragments(Vec<String>),
    FailAfter(Vec<String>),
}

/// Records the last assembled prompt and replies with a fixed completion.
struct ScriptedGeneration {
    reply: String,
    script: StreamScript,
    last_prompt: Mutex<Option<Prompt>>,
}

impl ScriptedGeneration {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            script: StreamScript::Fragments(vec![reply.to_string()]),
            last_prompt: Mutex::new(None),
        }
    }

    fn streaming(fragments: &[&str]) -> Self {
        Self {
            reply: fragments.concat(),
            script: StreamScript::Fragments(fragments.iter().map(|f| f.to_string()).collect()),
            last_prompt: Mutex::new(None),
        }
    }

    fn failing_after(fragments: &[&str]) -> Self {
        Self {
            reply: fragments.concat(),
            script: StreamScript::FailAfter(fragments.iter().map(|f| f.to_string()).collect()),
            last_prompt: Mutex::new(None),
        }
    }

    fn recorded_prompt(&self) -> Prompt {
        self.last_prompt
            .lock()
            .unwrap()
            .clone()
            .expect("no prompt recorded")
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGeneration {
    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError> {
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        Ok(self.reply.clone())
    }

    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream, DomainError> {
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        let items: Vec<Result<String, DomainError>> = match &self.script {
            StreamScript::Fragments(fragments) => {
                fragments.iter().cloned().map(Ok).collect()
            }
            StreamScript::FailAfter(fragments) => fragments
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(DomainError::generation(
                    "provider dropped the connection",
                ))))
                .collect(),
        };
        Ok(Box::pin(tokio_stream::iter(items)))
    }
}

struct Harness {
    chat: Arc<ChatService>,
    sessions: Arc<SessionManager>,
    ingest: Arc<IngestService>,
    generation: Arc<ScriptedGeneration>,
    store: Arc<dyn ConversationStore>,
}

fn harness(generation: ScriptedGeneration) -> Harness {
    let embedding: Arc<dyn EmbeddingProvider> = Arc::new(BagOfWordsEmbedding);
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
    let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());

    let retrieval = Arc::new(RetrievalService::new(embedding.clone(), index.clone(), 2));
    let ingest = Arc::new(IngestService::new(embedding, index, 160, 40));
    let sessions = Arc::new(SessionManager::new(store.clone()));
    let generation = Arc::new(generation);
    let chat = Arc::new(ChatService::new(
        generation.clone(),
        retrieval,
        store.clone(),
        sessions.clone(),
        ChatPolicy::default(),
    ));

    Harness {
        chat,
        sessions,
        ingest,
        generation,
        store,
    }
}

fn protein_pages() -> Vec<PageText> {
    vec![
        PageText {
            page: 1,
            text: "Alpine weather shifts quickly near exposed ridgelines, and forecasts \
                   lose accuracy above the treeline."
                .to_string(),
        },
        PageText {
            page: 2,
            text: "Protein folding determines enzyme function. A protein is a chain of \
                   amino acids whose folded shape creates the active site. Misfolded \
                   proteins lose catalytic activity, and chaperones assist folding of \
                   nascent amino acid chains inside the cell."
                .to_string(),
        },
        PageText {
            page: 3,
            text: "Harbor tides follow the lunar cycle, with spring tides arriving just \
                   after each full moon."
                .to_string(),
        },
    ]
}

#[tokio::test]
async fn chat_without_index_omits_context_and_persists_both_turns() {
    let h = harness(ScriptedGeneration::replying(
        "The indexed documents do not contain enough information to answer that question.",
    ));
    let session = h.sessions.create().await.unwrap();

    let response = h
        .chat
        .generate(&session, "What is protein folding?", true)
        .await
        .unwrap();

    assert_eq!(
        response,
        "The indexed documents do not contain enough information to answer that question."
    );

    // Nothing indexed yet: the prompt must carry no context block.
    let prompt = h.generation.recorded_prompt();
    assert!(!prompt.system.contains("Context:"));
    assert_eq!(prompt.turns.len(), 1);
    assert_eq!(prompt.turns[0].content, "What is protein folding?");

    let history = h.sessions.history(&session).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[0].content, "What is protein folding?");
    assert_eq!(history[1].role, MessageRole::Assistant);
    assert_eq!(history[1].content, response);
}

#[tokio::test]
async fn retrieval_grounds_the_prompt_in_the_right_page() {
    let h = harness(ScriptedGeneration::replying(
        "Protein folding creates the active site (Source: page 2).",
    ));
    let chunks = h.ingest.index_pages(&protein_pages(), false).await.unwrap();
    assert!(chunks >= 3);

    let session = h.sessions.create().await.unwrap();
    h.chat
        .generate(&session, "How does protein folding affect amino acids?", true)
        .await
        .unwrap();

    let prompt = h.generation.recorded_prompt();
    assert!(prompt.system.contains("Context:"));
    assert!(prompt.system.contains("(Source: page 2)"));
    assert!(prompt.system.to_lowercase().contains("protein"));
}

#[tokio::test]
async fn history_accumulates_across_turns_and_feeds_the_prompt() {
    let h = harness(ScriptedGeneration::replying("Noted."));
    let session = h.sessions.create().await.unwrap();

    h.chat.generate(&session, "First question", false).await.unwrap();
    h.chat.generate(&session, "Second question", false).await.unwrap();

    // The second prompt carries the full first turn plus the new message.
    let prompt = h.generation.recorded_prompt();
    assert_eq!(prompt.turns.len(), 3);
    assert_eq!(prompt.turns[0].content, "First question");
    assert_eq!(prompt.turns[1].content, "Noted.");
    assert_eq!(prompt.turns[2].content, "Second question");

    let history = h.sessions.history(&session).await.unwrap();
    assert_eq!(history.len(), 4);
}

#[tokio::test]
async fn rename_preserves_history_under_the_new_id() {
    let h = harness(ScriptedGeneration::replying("Hello."));
    let session = h.sessions.create().await.unwrap();
    h.chat.generate(&session, "Hi there", false).await.unwrap();

    h.sessions.rename(&session, "renamed-session").await.unwrap();

    let err = h.sessions.history(&session).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let history = h.sessions.history("renamed-session").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "Hi there");
    assert_eq!(history[1].content, "Hello.");
}

#[tokio::test]
async fn streamed_turn_persists_assistant_after_completion() {
    let h = harness(ScriptedGeneration::streaming(&["Hel", "lo ", "world"]));
    let session = h.sessions.create().await.unwrap();

    let fragments: Vec<String> = h
        .chat
        .stream(&session, "Say hello")
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(fragments.concat(), "Hello world");

    let history = h.sessions.history(&session).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[1].role, MessageRole::Assistant);
    assert_eq!(history[1].content, "Hello world");
}

#[tokio::test]
async fn cancelled_stream_leaves_only_the_user_turn() {
    // More fragments than the channel buffers, so the producer is still
    // running when the consumer walks away.
    let fragments: Vec<String> = (0..32).map(|i| format!("fragment {i} ")).collect();
    let refs: Vec<&str> = fragments.iter().map(String::as_str).collect();
    let h = harness(ScriptedGeneration::streaming(&refs));
    let session = h.sessions.create().await.unwrap();

    let mut stream = h.chat.stream(&session, "Tell me everything").await.unwrap();
    let first = stream.next().await;
    assert!(first.is_some());
    drop(stream);

    // Give the producer time to observe the closed channel and exit.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let history = h.sessions.history(&session).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[0].content, "Tell me everything");
}

#[tokio::test]
async fn provider_failure_surfaces_as_in_band_error_fragment() {
    let h = harness(ScriptedGeneration::failing_after(&["Partial ans"]));
    let session = h.sessions.create().await.unwrap();

    let fragments: Vec<String> = h
        .chat
        .stream(&session, "Doomed question")
        .await
        .unwrap()
        .collect()
        .await;

    let last = fragments.last().expect("stream produced no fragments");
    assert!(last.starts_with(STREAM_ERROR_MARKER));

    // The failed response is never persisted.
    let history = h.sessions.history(&session).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, MessageRole::User);
}

#[tokio::test]
async fn chat_on_unknown_session_starts_from_empty_history() {
    let h = harness(ScriptedGeneration::replying("Fresh start."));

    let response = h
        .chat
        .generate("never-created", "Hello?", false)
        .await
        .unwrap();
    assert_eq!(response, "Fresh start.");

    let prompt = h.generation.recorded_prompt();
    assert_eq!(prompt.turns.len(), 1);

    // The turn is persisted under the previously unknown id.
    let history = h.sessions.history("never-created").await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn concurrent_turns_on_one_session_never_corrupt_storage() {
    let h = harness(ScriptedGeneration::replying("Reply."));
    let session = h.sessions.create().await.unwrap();

    let (a, b) = tokio::join!(
        h.chat.generate(&session, "First concurrent", false),
        h.chat.generate(&session, "Second concurrent", false),
    );
    a.unwrap();
    b.unwrap();

    let history = h.sessions.history(&session).await.unwrap();
    assert_eq!(history.len(), 4);
    let users = history
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .count();
    assert_eq!(users, 2);

    // Storage stays structurally sound: every message readable in order.
    let conversation = h.store.get(&session).await.unwrap().unwrap();
    assert_eq!(conversation.messages.len(), 4);
}

#[tokio::test]
async fn clearing_documents_returns_retrieval_to_empty_context() {
    let h = harness(ScriptedGeneration::replying("ok"));
    h.ingest.index_pages(&protein_pages(), false).await.unwrap();

    h.ingest.clear().await.unwrap();

    let session = h.sessions.create().await.unwrap();
    h.chat
        .generate(&session, "What about proteins?", true)
        .await
        .unwrap();

    let prompt = h.generation.recorded_prompt();
    assert!(!prompt.system.contains("Context:"));
}
