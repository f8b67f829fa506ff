//! Anthropic Provider - Implementation of AIProvider for Anthropic's Messages API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = AnthropicConfig::new(api_key)
//!     .with_model("claude-sonnet-4-20250514")
//!     .with_prompt_cache(true);
//!
//! let provider = AnthropicProvider::new(config)?;
//! ```
//!
//! # Prompt caching
//!
//! With caching enabled the system prompt is sent as a single text block
//! marked `cache_control: ephemeral`, so repeated runs with the same
//! instructions are billed as cache reads. Cache writes and reads are
//! reported separately in [`Stats`](crate::domain::analysis::Stats).

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::http;
use crate::domain::analysis::{Pricing, TokenUsage};
use crate::domain::retry::RetryEngine;
use crate::ports::{AIError, AIProvider, AnalysisOutcome, ModelInfo};

const PROVIDER: &str = "anthropic";

/// Anthropic API version header value.
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Context window of current Claude models.
const CONTEXT_LIMIT: u32 = 200_000;

/// Configuration for the Anthropic provider.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use (e.g., "claude-sonnet-4-20250514").
    pub model: String,
    /// Base URL for the API (default: https://api.anthropic.com).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum output tokens per call.
    pub max_tokens: u32,
    /// Send the system prompt as a cacheable block.
    pub prompt_cache: bool,
}

impl AnthropicConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout: Duration::from_secs(120),
            max_tokens: 8000,
            prompt_cache: false,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum output tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Enables or disables prompt caching of the system prompt.
    pub fn with_prompt_cache(mut self, enabled: bool) -> Self {
        self.prompt_cache = enabled;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Anthropic API provider implementation.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
    retry: RetryEngine,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider with its own HTTP client.
    pub fn new(config: AnthropicConfig) -> Result<Self, AIError> {
        let client = http::build_client(config.timeout)?;
        Ok(Self::with_client(config, client))
    }

    /// Creates a provider that shares a caller-owned HTTP client.
    pub fn with_client(config: AnthropicConfig, client: Client) -> Self {
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

    /// Builds the messages endpoint URL.
    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    /// Converts the prompts to Anthropic's request format.
    fn to_anthropic_request(&self, system_prompt: &str, user_prompt: &str) -> AnthropicRequest {
        let system = if self.config.prompt_cache {
            SystemPrompt::Blocks(vec![SystemBlock {
                block_type: "text",
                text: system_prompt.to_string(),
                cache_control: CacheControl { kind: "ephemeral" },
            }])
        } else {
            SystemPrompt::Plain(system_prompt.to_string())
        };

        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: user_prompt.to_string(),
            }],
        }
    }

    /// Sends one request and returns the raw body of a successful response.
    async fn send_request(&self, request: &AnthropicRequest) -> Result<String, AIError> {
        let response = self
            .client
            .post(self.messages_url())
            .timeout(self.config.timeout)
            .header("x-api-key", self.config.api_key())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| http::map_send_error(e, self.config.timeout))?;

        http::read_body(PROVIDER, response, self.config.timeout).await
    }

    /// Parses a response body into model text and usage.
    fn parse_response(body: &str) -> Result<(String, TokenUsage), AIError> {
        if body.trim().is_empty() {
            return Err(AIError::EmptyBody);
        }

        let response: AnthropicResponse = serde_json::from_str(body)
            .map_err(|e| AIError::invalid_body(format!("Failed to parse response: {}", e)))?;

        if response.content.is_empty() {
            return Err(AIError::NoChoices);
        }

        if response.stop_reason.as_deref() == Some("max_tokens") {
            tracing::warn!("response truncated at max_tokens");
        }

        let text = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = response.usage.map(TokenUsage::from).unwrap_or_default();

        Ok((text, usage))
    }
}

#[async_trait]
impl AIProvider for AnthropicProvider {
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
            let request = self.to_anthropic_request(system_prompt, user_prompt);
            tracing::debug!(
                system_bytes = system_prompt.len(),
                user_bytes = user_prompt.len(),
                prompt_cache = self.config.prompt_cache,
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
                &Pricing::CLAUDE_SONNET,
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
            context_limit: CONTEXT_LIMIT,
            base_url: None,
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// ----- Anthropic API Types -----

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: SystemPrompt,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SystemPrompt {
    Plain(String),
    Blocks(Vec<SystemBlock>),
}

#[derive(Debug, Serialize)]
struct SystemBlock {
    #[serde(rename = "type")]
    block_type: &'static str,
    text: String,
    cache_control: CacheControl,
}

#[derive(Debug, Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

/// Counts are `integer | null` on the wire; null and missing both mean zero.
#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    cache_creation_input_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
}

impl From<AnthropicUsage> for TokenUsage {
    fn from(usage: AnthropicUsage) -> Self {
        TokenUsage::new(
            usage.input_tokens.unwrap_or(0),
            usage.output_tokens.unwrap_or(0),
        )
        .with_cache(
            usage.cache_creation_input_tokens.unwrap_or(0),
            usage.cache_read_input_tokens.unwrap_or(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(config: AnthropicConfig) -> AnthropicProvider {
        AnthropicProvider::with_client(config, Client::new())
    }

    #[test]
    fn config_builder_works() {
        let config = AnthropicConfig::new("test-key")
            .with_model("claude-3-haiku-20240307")
            .with_base_url("https://custom.api.com")
            .with_timeout(Duration::from_secs(30))
            .with_max_tokens(1024)
            .with_prompt_cache(true);

        assert_eq!(config.model, "claude-3-haiku-20240307");
        assert_eq!(config.base_url, "https://custom.api.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_tokens, 1024);
        assert!(config.prompt_cache);
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = AnthropicConfig::new("sk-ant-super-secret");
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn request_uses_plain_system_string_by_default() {
        let request = provider(AnthropicConfig::new("k")).to_anthropic_request("rules", "logs");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 8000,
                "system": "rules",
                "messages": [{"role": "user", "content": "logs"}]
            })
        );
    }

    #[test]
    fn request_marks_system_block_cacheable_when_enabled() {
        let request = provider(AnthropicConfig::new("k").with_prompt_cache(true))
            .to_anthropic_request("rules", "logs");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json["system"],
            json!([{"type": "text", "text": "rules", "cache_control": {"type": "ephemeral"}}])
        );
    }

    #[test]
    fn messages_url_tolerates_trailing_slash() {
        let p = provider(AnthropicConfig::new("k").with_base_url("http://localhost:9/"));
        assert_eq!(p.messages_url(), "http://localhost:9/v1/messages");
    }

    #[test]
    fn parse_response_concatenates_text_blocks_only() {
        let body = json!({
            "content": [
                {"type": "text", "text": "{\"a\":"},
                {"type": "tool_use", "id": "x", "name": "y", "input": {}},
                {"type": "text", "text": "1}"}
            ],
            "stop_reason": "end_turn",
            "usage": {
                "input_tokens": 10,
                "output_tokens": 5,
                "cache_creation_input_tokens": 7,
                "cache_read_input_tokens": 3
            }
        })
        .to_string();

        let (text, usage) = AnthropicProvider::parse_response(&body).unwrap();
        assert_eq!(text, "{\"a\":1}");
        assert_eq!(usage, TokenUsage::new(10, 5).with_cache(7, 3));
    }

    #[test]
    fn parse_response_defaults_missing_cache_counts() {
        let body = r#"{"content":[{"type":"text","text":"x"}],"usage":{"input_tokens":1,"output_tokens":2}}"#;
        let (_, usage) = AnthropicProvider::parse_response(body).unwrap();
        assert_eq!(usage.cache_creation_tokens, 0);
        assert_eq!(usage.cache_read_tokens, 0);
    }

    #[test]
    fn parse_response_treats_null_cache_counts_as_zero() {
        let body = json!({
            "content": [{"type": "text", "text": "x"}],
            "stop_reason": "end_turn",
            "usage": {
                "input_tokens": 1000,
                "output_tokens": 500,
                "cache_creation_input_tokens": null,
                "cache_read_input_tokens": null
            }
        })
        .to_string();

        let (_, usage) = AnthropicProvider::parse_response(&body).unwrap();
        assert_eq!(usage, TokenUsage::new(1000, 500));
    }

    #[test]
    fn parse_response_accepts_null_usage() {
        let body = r#"{"content":[{"type":"text","text":"x"}],"usage":null}"#;
        let (_, usage) = AnthropicProvider::parse_response(body).unwrap();
        assert_eq!(usage, TokenUsage::default());
    }

    #[test]
    fn parse_response_rejects_empty_body_and_content() {
        assert!(matches!(
            AnthropicProvider::parse_response(""),
            Err(AIError::EmptyBody)
        ));
        assert!(matches!(
            AnthropicProvider::parse_response(r#"{"content":[]}"#),
            Err(AIError::NoChoices)
        ));
        assert!(matches!(
            AnthropicProvider::parse_response("<html>"),
            Err(AIError::InvalidBody(_))
        ));
    }

    #[test]
    fn model_info_reports_cloud_limits() {
        let info = provider(AnthropicConfig::new("k").with_max_tokens(4096)).model_info();
        assert_eq!(info.provider, "anthropic");
        assert_eq!(info.max_tokens, 4096);
        assert_eq!(info.context_limit, 200_000);
        assert_eq!(info.base_url, None);
    }

    #[test]
    fn cloud_provider_has_no_connection_probe() {
        assert!(provider(AnthropicConfig::new("k")).connection_probe().is_none());
    }
}
