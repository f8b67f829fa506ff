//! Retry module - error classification, backoff and the retry loop.

mod classifier;
mod engine;

pub use classifier::{backoff_for, classify, ErrorClass, RetryableError};
pub use engine::{RetryEngine, RetryError, MAX_ATTEMPTS};
