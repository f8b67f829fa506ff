//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - LLM backends (Anthropic, LM Studio, Ollama)

pub mod ai;

pub use ai::build_provider;
