//! Domain layer containing the core analysis logic.
//!
//! # Module Organization
//!
//! - `analysis` - Validated analysis, system status, usage and cost accounting
//! - `response` - Extraction, escape repair and validation of model output
//! - `retry` - Error classification, backoff and the retry loop
//! - `sanitizer` - Prompt-injection filtering and credential redaction

pub mod analysis;
pub mod response;
pub mod retry;
pub mod sanitizer;
