//! LM Studio Provider - AIProvider for LM Studio's OpenAI-compatible server.
//!
//! # Configuration
//!
//! ```ignore
//! let config = LmStudioConfig::new()
//!     .with_base_url("http://gpu-box:1234")
//!     .with_model("qwen2.5-7b-instruct");
//!
//! let provider = LmStudioProvider::new(config)?;
//! provider.check_connection(&cancel).await?;
//! ```

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

const PROVIDER: &str = "lmstudio";

const TEMPERATURE: f32 = 0.1;
const TOP_P: f32 = 0.9;

/// Model ids that mean "whatever is loaded" to LM Studio.
const GENERIC_MODEL_IDS: [&str; 3] = ["", "local-model", "default"];

/// Configuration for the LM Studio provider.
#[derive(Debug, Clone)]
pub struct LmStudioConfig {
    /// Model id as listed by `/v1/models`.
    pub model: String,
    /// Server address (default: http://localhost:1234).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum output tokens per call.
    pub max_tokens: u32,
    /// Context window of the loaded model.
    pub context_limit: u32,
}

impl Default for LmStudioConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LmStudioConfig {
    pub fn new() -> Self {
        Self {
            model: "local-model".to_string(),
            base_url: "http://localhost:1234".to_string(),
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

    fn is_generic_model(&self) -> bool {
        GENERIC_MODEL_IDS.contains(&self.model.as_str())
    }
}

/// LM Studio provider implementation.
pub struct LmStudioProvider {
    config: LmStudioConfig,
    client: Client,
    retry: RetryEngine,
}

impl LmStudioProvider {
    /// Creates a new provider with its own HTTP client.
    pub fn new(config: LmStudioConfig) -> Result<Self, AIError> {
        let client = http::build_client(config.timeout)?;
        Ok(Self::with_client(config, client))
    }

    /// Creates a provider that shares a caller-owned HTTP client.
    pub fn with_client(config: LmStudioConfig, client: Client) -> Self {
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

    fn to_chat_request(&self, system_prompt: &str, user_prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            stream: false,
        }
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<String, AIError> {
        let response = self
            .client
            .post(self.url("/v1/chat/completions"))
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

        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| AIError::invalid_body(format!("Failed to parse response: {}", e)))?;

        let choice = response.choices.into_iter().next().ok_or(AIError::NoChoices)?;
        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!("response truncated at max_tokens");
        }

        let usage = response
            .usage
            .map(|u| {
                TokenUsage::new(u.prompt_tokens.unwrap_or(0), u.completion_tokens.unwrap_or(0))
            })
            .unwrap_or_default();

        Ok((choice.message.content.unwrap_or_default(), usage))
    }

    async fn list_models(&self) -> Result<Vec<String>, AIError> {
        let response = self
            .client
            .get(self.url("/v1/models"))
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| http::map_send_error(e, self.config.timeout))?;

        let body = http::read_body(PROVIDER, response, self.config.timeout).await?;
        let models: ModelList = serde_json::from_str(&body)
            .map_err(|e| AIError::invalid_body(format!("Failed to parse model list: {}", e)))?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl AIProvider for LmStudioProvider {
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
impl ConnectionProbe for LmStudioProvider {
    async fn check_connection(&self, cancel: &CancellationToken) -> Result<(), AIError> {
        let models = http::with_cancel(cancel, self.list_models()).await?;

        if models.is_empty() {
            return Err(AIError::NoModelsAvailable(self.config.base_url.clone()));
        }

        if !self.config.is_generic_model()
            && !models
                .iter()
                .any(|id| id == &self.config.model || id.contains(&self.config.model))
        {
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

// ----- OpenAI-compatible wire types -----

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}
