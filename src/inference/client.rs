//! OpenAI-compatible inference client.
//!
//! Sends non-streaming chat completion requests to a local or hosted LLM
//! endpoint. Walks the fallback chain when the active model is unavailable.

use std::time::Duration;

use reqwest::Client as HttpClient;

use super::config::{resolve_active_model, ModelConfig, ModelsConfig, STATIC_RESPONSE_KEY};
use super::errors::InferenceError;
use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Completion, ResponseFormat,
    SamplingOverrides,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout. Local models can take a while on long prompts.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the text-generation endpoint.
///
/// Created from `ModelsConfig`. Calls share nothing but the HTTP connection
/// pool: each call starts from the active model and tracks its own place in
/// the fallback chain, so concurrent calls never wait on each other.
#[derive(Clone)]
pub struct InferenceClient {
    http: HttpClient,
    /// The full models configuration (for fallback chain).
    config: ModelsConfig,
    /// The active model key (e.g., "local").
    active_key: String,
    active_model: ModelConfig,
}

impl InferenceClient {
    /// Create a new inference client from the models configuration.
    ///
    /// Resolves the active model from config. Does NOT check connectivity;
    /// that happens on the first request.
    pub fn from_config(config: ModelsConfig) -> Result<Self, InferenceError> {
        let (key, model) = resolve_active_model(&config)?;

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: model.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            config,
            active_key: key,
            active_model: model,
        })
    }

    /// The base URL of the active model's endpoint.
    pub fn active_base_url(&self) -> &str {
        &self.active_model.base_url
    }

    /// The display name of the active model.
    pub fn active_model_name(&self) -> &str {
        &self.active_model.display_name
    }

    // ─── Chat Completion ─────────────────────────────────────────────────

    /// Send a chat completion request, walking the fallback chain on
    /// retriable failures.
    ///
    /// `json_response` requests `response_format: json_object` from models
    /// configured with `force_json_response`.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        json_response: bool,
        sampling: Option<SamplingOverrides>,
    ) -> Result<Completion, InferenceError> {
        let mut key = self.active_key.clone();
        let mut model = self.active_model.clone();
        let mut exhausted: Vec<String> = Vec::new();

        loop {
            match self
                .try_request(&key, &model, &messages, json_response, sampling.as_ref())
                .await
            {
                Ok(completion) => return Ok(completion),
                Err(e) if Self::is_retriable(&e) => {
                    tracing::warn!(
                        model = %key,
                        error = %e,
                        "model unavailable, trying next fallback"
                    );
                    exhausted.push(key);
                    match self.next_fallback(&exhausted) {
                        Some((next_key, next_model)) => {
                            key = next_key;
                            model = next_model;
                        }
                        None => break,
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(InferenceError::AllModelsUnavailable {
            attempted: exhausted,
        })
    }

    /// Attempt a single request to one model.
    async fn try_request(
        &self,
        key: &str,
        model: &ModelConfig,
        messages: &[ChatMessage],
        json_response: bool,
        sampling: Option<&SamplingOverrides>,
    ) -> Result<Completion, InferenceError> {
        let url = format!("{}/chat/completions", model.base_url);
        let model_name = model.model_name.clone().unwrap_or_else(|| key.to_string());

        let temperature = sampling
            .and_then(|s| s.temperature)
            .unwrap_or(model.temperature);
        let top_p = sampling.and_then(|s| s.top_p);

        let response_format =
            (json_response && model.force_json_response).then(ResponseFormat::json_object);

        let body = ChatCompletionRequest {
            model: model_name,
            messages: messages.to_vec(),
            temperature,
            top_p,
            max_tokens: model.max_tokens,
            stream: false,
            response_format,
        };

        // Metadata only; prompts can be large.
        tracing::info!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            json = body.response_format.is_some(),
            max_tokens = body.max_tokens,
            "=== LLM REQUEST ==="
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout {
                        duration_secs: REQUEST_TIMEOUT.as_secs(),
                    }
                } else {
                    InferenceError::ConnectionFailed {
                        endpoint: url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| InferenceError::ResponseParse {
                reason: format!("failed to read response body: {e}"),
            })?;

        Self::parse_response(key, &body_text)
    }

    /// Extract the first choice's content from a completion body.
    fn parse_response(key: &str, body: &str) -> Result<Completion, InferenceError> {
        let resp: ChatCompletionResponse =
            serde_json::from_str(body).map_err(|e| InferenceError::ResponseParse {
                reason: format!("failed to parse completion: {e}"),
            })?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::ResponseParse {
                reason: "empty choices array".into(),
            })?;

        // Reasoning models that exhaust max_tokens while thinking leave
        // `content` empty.
        let text = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| InferenceError::EmptyResponse {
                model: key.to_string(),
            })?;

        tracing::info!(
            model = %key,
            chars = text.len(),
            finish_reason = ?choice.finish_reason,
            "=== LLM RESPONSE ==="
        );

        Ok(Completion {
            text,
            model: resp.model.unwrap_or_else(|| key.to_string()),
            finish_reason: choice.finish_reason,
        })
    }

    // ─── Health Check ────────────────────────────────────────────────────

    /// Check if the active model endpoint is reachable.
    ///
    /// Lists models rather than generating, so no tokens are spent.
    pub async fn health_check(&self) -> Result<bool, InferenceError> {
        let url = format!("{}/models", self.active_model.base_url);

        match self.http.get(&url).timeout(CONNECT_TIMEOUT).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    // ─── Fallback Chain ──────────────────────────────────────────────────

    /// The first model in the fallback chain not yet tried.
    fn next_fallback(&self, exhausted: &[String]) -> Option<(String, ModelConfig)> {
        self.config
            .fallback_chain
            .iter()
            .filter(|key| !exhausted.contains(key) && key.as_str() != STATIC_RESPONSE_KEY)
            .find_map(|key| {
                self.config
                    .models
                    .get(key)
                    .map(|model| (key.clone(), model.clone()))
            })
    }

    /// Whether an error should trigger a fallback attempt.
    ///
    /// 404 means the model is not installed on that runtime; 500 and 502-504
    /// are transient server failures.
    fn is_retriable(err: &InferenceError) -> bool {
        matches!(
            err,
            InferenceError::ConnectionFailed { .. }
                | InferenceError::Timeout { .. }
                | InferenceError::HttpError { status: 404, .. }
                | InferenceError::HttpError { status: 500, .. }
                | InferenceError::HttpError { status: 502..=504, .. }
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
