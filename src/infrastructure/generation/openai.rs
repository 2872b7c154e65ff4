use std::time::Duration;

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt as _;
use rig::providers::openai;

use crate::domain::ports::{FragmentStream, GenerationProvider};
use crate::domain::{DomainError, Prompt};
use crate::infrastructure::config::LlmConfig;

/// OpenAI chat completion via rig. Reads `OPENAI_API_KEY` from the
/// environment.
pub struct OpenAiGeneration {
    model: String,
    timeout: Duration,
}

impl OpenAiGeneration {
    pub fn new(model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            timeout,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(&config.model, Duration::from_secs(config.timeout_seconds))
    }
}

/// Flattens ordered turns into a single prompt string: prior turns become a
/// role-tagged transcript, the final user turn stays the current message.
fn render_turns(prompt: &Prompt) -> String {
    let Some((current, prior)) = prompt.turns.split_last() else {
        return String::new();
    };

    if prior.is_empty() {
        return current.content.clone();
    }

    let transcript = prior
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Previous conversation:\n{}\n\nCurrent message from user: {}",
        transcript, current.content
    )
}

#[async_trait]
impl GenerationProvider for OpenAiGeneration {
    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError> {
        let client = openai::Client::from_env();
        let agent = client.agent(&self.model).preamble(&prompt.system).build();

        tokio::time::timeout(self.timeout, agent.prompt(&render_turns(prompt)))
            .await
            .map_err(|_| DomainError::generation("generation timed out"))?
            .map_err(|e| DomainError::generation(e.to_string()))
    }

    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream, DomainError> {
        // The high-level prompt API is not incremental; the full completion
        // arrives as one fragment.
        let text = self.complete(prompt).await?;
        Ok(Box::pin(tokio_stream::once(Ok(text))))
    }
}
