//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid request timeout for {0}")]
    InvalidTimeout(&'static str),

    #[error("max_tokens must be greater than zero for {0}")]
    InvalidMaxTokens(&'static str),

    #[error("Base URL for {0} must start with http:// or https://")]
    InvalidBaseUrl(&'static str),
}
