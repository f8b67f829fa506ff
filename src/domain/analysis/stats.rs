//! Usage accounting for a single analysis call.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token counts reported by a backend for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
}

impl TokenUsage {
    /// Usage without any prompt-cache activity.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            ..Default::default()
        }
    }

    /// Adds prompt-cache write and read counts.
    pub fn with_cache(mut self, creation: u64, read: u64) -> Self {
        self.cache_creation_tokens = creation;
        self.cache_read_tokens = read;
        self
    }
}

/// Per-million-token prices in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
}

impl Pricing {
    /// Claude Sonnet list prices.
    pub const CLAUDE_SONNET: Pricing = Pricing {
        input: 3.0,
        output: 15.0,
        cache_write: 3.75,
        cache_read: 0.30,
    };

    /// Local inference has no marginal monetary cost.
    pub const FREE: Pricing = Pricing {
        input: 0.0,
        output: 0.0,
        cache_write: 0.0,
        cache_read: 0.0,
    };

    /// Computes the USD cost of the given usage.
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        const PER: f64 = 1_000_000.0;
        usage.input_tokens as f64 / PER * self.input
            + usage.output_tokens as f64 / PER * self.output
            + usage.cache_creation_tokens as f64 / PER * self.cache_write
            + usage.cache_read_tokens as f64 / PER * self.cache_read
    }
}

/// Usage and cost of one successful analysis call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub cost_usd: f64,
    pub duration_seconds: f64,
    pub provider: String,
    pub model: String,
}

impl Stats {
    /// Builds stats from reported usage, a pricing table and the elapsed time.
    pub fn compute(
        usage: TokenUsage,
        pricing: &Pricing,
        elapsed: Duration,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cache_creation_tokens: usage.cache_creation_tokens,
            cache_read_tokens: usage.cache_read_tokens,
            cost_usd: pricing.cost(&usage),
            duration_seconds: elapsed.as_secs_f64(),
            provider: provider.into(),
            model: model.into(),
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_creation_tokens + self.cache_read_tokens
    }
}
