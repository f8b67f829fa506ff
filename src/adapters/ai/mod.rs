//! AI Provider Adapters.
//!
//! Implementations of the AIProvider port for the supported LLM backends.
//!
//! ## Available Adapters
//!
//! - `AnthropicProvider` - Anthropic Claude models via the Messages API
//! - `LmStudioProvider` - Local models behind LM Studio's OpenAI-compatible server
//! - `OllamaProvider` - Local models via Ollama's native chat API

mod anthropic_provider;
mod http;
mod lmstudio_provider;
mod ollama_provider;

pub use anthropic_provider::{AnthropicConfig, AnthropicProvider};
pub use lmstudio_provider::{LmStudioConfig, LmStudioProvider};
pub use ollama_provider::{OllamaConfig, OllamaProvider};

use secrecy::ExposeSecret;
use std::sync::Arc;

use crate::config::{AiConfig, AiProvider};
use crate::ports::{AIError, AIProvider};

/// Constructs the adapter selected by `config.provider`.
pub fn build_provider(config: &AiConfig) -> Result<Arc<dyn AIProvider>, AIError> {
    let provider: Arc<dyn AIProvider> = match config.provider {
        AiProvider::Anthropic => {
            let settings = &config.anthropic;
            let api_key = settings
                .api_key
                .as_ref()
                .map(|k| k.expose_secret().clone())
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| AIError::Configuration("Anthropic API key is not set".to_string()))?;

            let anthropic = AnthropicConfig::new(api_key)
                .with_model(&settings.model)
                .with_base_url(&settings.base_url)
                .with_timeout(settings.timeout())
                .with_max_tokens(settings.max_tokens)
                .with_prompt_cache(settings.prompt_cache);
            Arc::new(AnthropicProvider::new(anthropic)?)
        }
        AiProvider::LmStudio => {
            let settings = &config.lmstudio;
            let lmstudio = LmStudioConfig::new()
                .with_model(&settings.model)
                .with_base_url(&settings.base_url)
                .with_timeout(settings.timeout())
                .with_max_tokens(settings.max_tokens)
                .with_context_limit(settings.context_limit);
            Arc::new(LmStudioProvider::new(lmstudio)?)
        }
        AiProvider::Ollama => {
            let settings = &config.ollama;
            let ollama = OllamaConfig::new()
                .with_model(&settings.model)
                .with_base_url(&settings.base_url)
                .with_timeout(settings.timeout())
                .with_max_tokens(settings.max_tokens)
                .with_context_limit(settings.context_limit);
            Arc::new(OllamaProvider::new(ollama)?)
        }
    };

    tracing::debug!(
        provider = provider.provider_name(),
        model = %provider.model_info().model,
        "provider constructed"
    );
    Ok(provider)
}
