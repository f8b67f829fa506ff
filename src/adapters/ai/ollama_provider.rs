//! Ollama Provider - AIProvider for Ollama's native chat API.
//!
//! Requests JSON-formatted output (`format: "json"`) and refuses responses
//! the server reports as unfinished.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::http;
use crate::domain::analysis::{Pricing, TokenUsage};
use crate::domain::retry::RetryEngine;
use crate::ports::{AIError, AIProvider, AnalysisOutcome, ConnectionProbe, ModelInfo};

const PROVIDER: &str = "ollama";

const TEMPERATURE: f32 = 0.1;
const TOP_P: f32 = 0.9;

/// Configuration for the Ollama provider.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Model name, optionally with a tag (e.g. "llama3.1", "qwen2.5:7b").
    pub model: String,
    /// Server address (default: http://localhost:11434).
    pub base_url: String,
    pub timeout: Duration,
    /// Sent as `options.num_predict`.
    pub max_tokens: u32,
    pub context_limit: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaConfig {
    pub fn new() -> Self {
        Self {
            model: "llama3.1".to_string(),
            base_url: "http://localhost:11434".to_string(),
            timeout: Duration::from_secs(300),
            max_tokens: 8000,
            context_limit: 8192,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_context_limit(mut self, context_limit: u32) -> Self {
        self.context_limit = context_limit;
        self
    }
}

/// Ollama provider implementation.
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
    retry: RetryEngine,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Result<Self, AIError> {
        let client = http::build_client(config.timeout)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: OllamaConfig, client: Client) -> Self {
        Self {
            config,
            client,
            retry: RetryEngine::new(),
        }
    }

    /// Replaces the default retry policy.
    pub fn with_retry_engine(mut self, retry: RetryEngine) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn to_chat_request(&self, system_prompt: &str, user_prompt: &str) -> OllamaRequest {
        OllamaRequest {
            model: self.config.model.clone(),
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                OllamaMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
            stream: false,
            format: "json",
            options: OllamaOptions {
                num_predict: self.config.max_tokens,
                temperature: TEMPERATURE,
                top_p: TOP_P,
            },
        }
    }

    async fn send_request(&self, request: &OllamaRequest) -> Result<String, AIError> {
        let response = self
            .client
            .post(self.url("/api/chat"))
            .timeout(self.config.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| http::map_send_error(e, self.config.timeout))?;

        http::read_body(PROVIDER, response, self.config.timeout).await
    }

    fn parse_response(body: &str) -> Result<(String, TokenUsage), AIError> {
        if body.trim().is_empty() {
            return Err(AIError::EmptyBody);
        }

        let response: OllamaResponse = serde_json::from_str(body)
            .map_err(|e| AIError::invalid_body(format!("Failed to parse response: {}", e)))?;

        let message = response.message.ok_or(AIError::NoChoices)?;
        if !response.done {
            return Err(AIError::IncompleteResponse);
        }

        let usage = TokenUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );
        Ok((message.content, usage))
    }

    async fn list_models(&self) -> Result<Vec<String>, AIError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| http::map_send_error(e, self.config.timeout))?;

        let body = http::read_body(PROVIDER, response, self.config.timeout).await?;
        let tags: TagList = serde_json::from_str(&body)
            .map_err(|e| AIError::invalid_body(format!("Failed to parse model list: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// True when `name` is `model` itself or `model` with a `:tag` suffix.
fn model_matches(name: &str, model: &str) -> bool {
    name == model || name.split(':').next() == Some(model)
}

#[async_trait]
impl AIProvider for OllamaProvider {
    async fn analyze(
        &self,
        cancel: &CancellationToken,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<AnalysisOutcome, AIError> {
        let span = tracing::info_span!(
            "analyze",
            request_id = %Uuid::new_v4(),
            provider = PROVIDER,
            model = %self.config.model,
        );

        async {
            let started = Instant::now();
            let request = self.to_chat_request(system_prompt, user_prompt);
            tracing::debug!(
                system_bytes = system_prompt.len(),
                user_bytes = user_prompt.len(),
                base_url = %self.config.base_url,
                "sending analysis request"
            );

            let body = self
                .retry
                .run(cancel, |_| self.send_request(&request))
                .await?;

            let (text, usage) = Self::parse_response(&body)?;
            http::finish(
                PROVIDER,
                &self.config.model,
                &text,
                usage,
                &Pricing::FREE,
                started,
            )
        }
        .instrument(span)
        .await
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model: self.config.model.clone(),
            provider: PROVIDER.to_string(),
            max_tokens: self.config.max_tokens,
            context_limit: self.config.context_limit,
            base_url: Some(self.config.base_url.clone()),
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn connection_probe(&self) -> Option<&dyn ConnectionProbe> {
        Some(self)
    }
}

#[async_trait]
impl ConnectionProbe for OllamaProvider {
    async fn check_connection(&self, cancel: &CancellationToken) -> Result<(), AIError> {
        let models = http::with_cancel(cancel, self.list_models()).await?;

        if models.is_empty() {
            return Err(AIError::NoModelsAvailable(self.config.base_url.clone()));
        }

        if !models.iter().any(|name| model_matches(name, &self.config.model)) {
            return Err(AIError::ModelNotAvailable {
                model: self.config.model.clone(),
                available: models,
            });
        }

        tracing::info!(
            provider = PROVIDER,
            base_url = %self.config.base_url,
            models = models.len(),
            "backend reachable"
        );
        Ok(())
    }
}

// ----- Ollama wire types -----

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}
