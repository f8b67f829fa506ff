//! AI Provider Port - Interface for LLM backends that analyse log content.
//!
//! This port hides three wire protocols (Anthropic Messages, the
//! OpenAI-compatible chat API served by LM Studio, and Ollama's native chat
//! API) behind one contract, so the orchestrator can analyse logs without
//! coupling to a specific backend.
//!
//! # Design
//!
//! - One call per analysis: system prompt + user prompt in, validated
//!   [`Analysis`] and usage [`Stats`] out
//! - Only the network call is retried; malformed model output is a content
//!   failure and is surfaced immediately
//! - Local backends additionally expose a [`ConnectionProbe`]
//! - Adapters are immutable after construction and safe to share
//!
//! # Example
//!
//! ```ignore
//! let provider: Arc<dyn AIProvider> = build_provider(&config.ai)?;
//! if let Some(probe) = provider.connection_probe() {
//!     probe.check_connection(&cancel).await?;
//! }
//! let outcome = provider.analyze(&cancel, SYSTEM_PROMPT, &user_prompt).await?;
//! println!("{} (${:.4})", outcome.analysis.system_status, outcome.stats.cost_usd);
//! ```

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::domain::analysis::{Analysis, Stats};
use crate::domain::response::ResponseError;
use crate::domain::retry::{RetryError, RetryableError};

/// Port for log-analysis backends.
///
/// Implementations translate between a backend's wire format and our
/// domain types.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Analyses `user_prompt` under the instructions in `system_prompt`.
    ///
    /// The network call honours `cancel`, including while backing off
    /// between retries.
    async fn analyze(
        &self,
        cancel: &CancellationToken,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<AnalysisOutcome, AIError>;

    /// Describes the configured model.
    fn model_info(&self) -> ModelInfo;

    /// Short provider identifier (e.g. "anthropic", "ollama").
    fn provider_name(&self) -> &'static str;

    /// Returns the reachability check for backends that have one.
    fn connection_probe(&self) -> Option<&dyn ConnectionProbe> {
        None
    }
}

/// Reachability check for locally hosted backends.
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    /// Verifies the backend answers and the configured model is available.
    ///
    /// When the model is missing, the error lists the models that are.
    async fn check_connection(&self, cancel: &CancellationToken) -> Result<(), AIError>;
}

/// Result of a successful analysis call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub analysis: Analysis,
    pub stats: Stats,
}

/// Description of the model behind a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Model identifier (e.g. "claude-sonnet-4-20250514", "llama3.1").
    pub model: String,
    /// Provider identifier, same as [`AIProvider::provider_name`].
    pub provider: String,
    /// Maximum output tokens requested per call.
    pub max_tokens: u32,
    /// Context window size in tokens.
    pub context_limit: u32,
    /// Endpoint for locally hosted backends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// AI provider errors.
///
/// Backend bodies quoted in these errors are redacted and truncated before
/// the error is built; no variant ever carries an API key.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    /// Transport failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u64,
    },

    /// Backend answered with a non-success status.
    #[error("{provider} returned status {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        /// Structured error type from the body (e.g. "overloaded_error").
        error_type: Option<String>,
        message: String,
    },

    /// Every network attempt failed.
    #[error("all retry attempts failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<AIError>,
    },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// Backend returned a zero-length body.
    #[error("empty response body")]
    EmptyBody,

    /// Backend returned no choices or messages.
    #[error("no choices in response")]
    NoChoices,

    /// Model produced no text.
    #[error("model returned empty content")]
    EmptyContent,

    /// Ollama reported the generation as unfinished.
    #[error("incomplete response: backend reported done=false")]
    IncompleteResponse,

    /// Body was not the backend's documented wire format.
    #[error("failed to parse response body: {0}")]
    InvalidBody(String),

    /// Model text could not be turned into a valid analysis.
    #[error("invalid model response: {0}")]
    Content(#[from] ResponseError),

    /// Configured model is not loaded on the backend.
    #[error("model '{model}' is not available; available models: {}", .available.join(", "))]
    ModelNotAvailable {
        model: String,
        available: Vec<String>,
    },

    /// Backend reports no models at all.
    #[error("no models available at {0}")]
    NoModelsAvailable(String),

    /// Provider could not be constructed from its configuration.
    #[error("provider configuration error: {0}")]
    Configuration(String),
}

impl AIError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates an invalid body error.
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::InvalidBody(message.into())
    }
}

impl RetryableError for AIError {
    fn error_code(&self) -> Option<&str> {
        match self {
            AIError::Api { error_type, .. } => error_type.as_deref(),
            _ => None,
        }
    }

    /// Only transport and HTTP-status failures are worth another network
    /// attempt.
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            AIError::Network(_) | AIError::Timeout { .. } | AIError::Api { .. }
        )
    }
}

impl From<RetryError<AIError>> for AIError {
    fn from(err: RetryError<AIError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => AIError::RetriesExhausted {
                attempts,
                source: Box::new(last),
            },
            RetryError::NotRetryable(last) => last,
            RetryError::Cancelled => AIError::Cancelled,
        }
    }
}
