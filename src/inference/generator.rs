//! Text-generation seam.
//!
//! The classifier and responders depend on [`TextGenerator`], not on the
//! HTTP client, so tests can script replies in-process.

use std::sync::Arc;

use async_trait::async_trait;

use super::client::InferenceClient;
use super::errors::InferenceError;
use super::types::{ChatMessage, SamplingOverrides};

/// One single-shot generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    /// Optional system instruction sent ahead of the prompt.
    pub system: Option<String>,
    pub prompt: String,
    /// Ask the backend for a JSON object reply.
    pub json: bool,
    pub sampling: Option<SamplingOverrides>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn expect_json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingOverrides) -> Self {
        self.sampling = Some(sampling);
        self
    }

    fn into_messages(self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(self.prompt));
        messages
    }
}

/// Anything that turns a prompt into text.
///
/// Implementations never return an empty string: a blank reply is an
/// [`InferenceError::EmptyResponse`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, InferenceError>;
}

/// [`TextGenerator`] backed by the shared [`InferenceClient`].
///
/// Clones share one client; calls run concurrently.
#[derive(Clone)]
pub struct LlmGenerator {
    client: Arc<InferenceClient>,
}

impl LlmGenerator {
    pub fn new(client: InferenceClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Whether the active model endpoint answers.
    pub async fn is_reachable(&self) -> bool {
        self.client.health_check().await.unwrap_or(false)
    }

    /// Display name of the model each call starts from.
    pub fn model_name(&self) -> &str {
        self.client.active_model_name()
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, InferenceError> {
        let json = request.json;
        let sampling = request.sampling;
        let messages = request.into_messages();

        match self.client.chat_completion(messages, json, sampling).await {
            Ok(completion) => Ok(completion.text),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    transport = e.is_transport(),
                    "text generation failed"
                );
                Err(e)
            }
        }
    }
}
