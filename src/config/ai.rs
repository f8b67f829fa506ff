//! AI provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// AI provider configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiConfig {
    /// Backend used for analysis
    #[serde(default)]
    pub provider: AiProvider,

    #[serde(default)]
    pub anthropic: AnthropicSettings,

    #[serde(default)]
    pub lmstudio: LmStudioSettings,

    #[serde(default)]
    pub ollama: OllamaSettings,
}

/// AI provider type
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Anthropic,
    LmStudio,
    Ollama,
}

impl AiConfig {
    /// Validate the section of the selected provider
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.provider {
            AiProvider::Anthropic => self.anthropic.validate(),
            AiProvider::LmStudio => {
                check_backend("lmstudio", &self.lmstudio.base_url, self.lmstudio.timeout_secs, self.lmstudio.max_tokens)
            }
            AiProvider::Ollama => {
                check_backend("ollama", &self.ollama.base_url, self.ollama.timeout_secs, self.ollama.max_tokens)
            }
        }
    }
}

/// Anthropic Messages API settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicSettings {
    /// API key, required when Anthropic is the selected provider
    pub api_key: Option<SecretString>,

    #[serde(default = "default_anthropic_url")]
    pub base_url: String,

    #[serde(default = "default_anthropic_model")]
    pub model: String,

    #[serde(default = "default_anthropic_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Mark the system prompt cacheable
    #[serde(default)]
    pub prompt_cache: bool,
}

impl AnthropicSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_api_key() {
            return Err(ValidationError::MissingRequired("LOGWARDEN__AI__ANTHROPIC__API_KEY"));
        }
        check_backend("anthropic", &self.base_url, self.timeout_secs, self.max_tokens)
    }
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_anthropic_url(),
            model: default_anthropic_model(),
            timeout_secs: default_anthropic_timeout(),
            max_tokens: default_max_tokens(),
            prompt_cache: false,
        }
    }
}

/// LM Studio server settings
#[derive(Debug, Clone, Deserialize)]
pub struct LmStudioSettings {
    #[serde(default = "default_lmstudio_url")]
    pub base_url: String,

    /// Generic ids ("local-model", "default") use whatever is loaded
    #[serde(default = "default_lmstudio_model")]
    pub model: String,

    #[serde(default = "default_local_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_context_limit")]
    pub context_limit: u32,
}

impl LmStudioSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LmStudioSettings {
    fn default() -> Self {
        Self {
            base_url: default_lmstudio_url(),
            model: default_lmstudio_model(),
            timeout_secs: default_local_timeout(),
            max_tokens: default_max_tokens(),
            context_limit: default_context_limit(),
        }
    }
}

/// Ollama server settings
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaSettings {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,

    #[serde(default = "default_local_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_context_limit")]
    pub context_limit: u32,
}

impl OllamaSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            timeout_secs: default_local_timeout(),
            max_tokens: default_max_tokens(),
            context_limit: default_context_limit(),
        }
    }
}

fn check_backend(
    backend: &'static str,
    base_url: &str,
    timeout_secs: u64,
    max_tokens: u32,
) -> Result<(), ValidationError> {
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ValidationError::InvalidBaseUrl(backend));
    }
    if timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout(backend));
    }
    if max_tokens == 0 {
        return Err(ValidationError::InvalidMaxTokens(backend));
    }
    Ok(())
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_anthropic_timeout() -> u64 {
    120
}

fn default_lmstudio_url() -> String {
    "http://localhost:1234".to_string()
}

fn default_lmstudio_model() -> String {
    "local-model".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1".to_string()
}

fn default_local_timeout() -> u64 {
    300
}

fn default_max_tokens() -> u32 {
    8000
}

fn default_context_limit() -> u32 {
    8192
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> AiConfig {
        AiConfig {
            anthropic: AnthropicSettings {
                api_key: Some(SecretString::new("sk-ant-xxx".to_string())),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_ai_config_defaults() {
        let config = AiConfig::default();
        assert_eq!(config.provider, AiProvider::Anthropic);
        assert_eq!(config.anthropic.timeout(), Duration::from_secs(120));
        assert_eq!(config.anthropic.max_tokens, 8000);
        assert!(!config.anthropic.prompt_cache);
        assert_eq!(config.lmstudio.timeout(), Duration::from_secs(300));
        assert_eq!(config.lmstudio.model, "local-model");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.ollama.context_limit, 8192);
    }

    #[test]
    fn test_validation_missing_anthropic_key() {
        let config = AiConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let mut config = with_key();
        config.anthropic.api_key = Some(SecretString::new("  ".to_string()));
        assert!(!config.anthropic.has_api_key());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(with_key().validate().is_ok());
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        let config = AiConfig {
            provider: AiProvider::Ollama,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let mut config = AiConfig {
            provider: AiProvider::LmStudio,
            ..Default::default()
        };
        config.lmstudio.timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidTimeout("lmstudio"))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_max_tokens() {
        let mut config = with_key();
        config.anthropic.max_tokens = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidMaxTokens("anthropic"))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_scheme() {
        let mut config = AiConfig {
            provider: AiProvider::Ollama,
            ..Default::default()
        };
        config.ollama.base_url = "localhost:11434".to_string();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBaseUrl("ollama"))
        ));
    }

    #[test]
    fn test_unselected_sections_are_not_validated() {
        let mut config = with_key();
        config.ollama.timeout_secs = 0;
        assert!(config.validate().is_ok());
    }
}
